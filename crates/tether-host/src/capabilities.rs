//! The host capability provider.
//!
//! Everything the session manager does *to* the host - changing
//! brightness, launching apps, reading state for a snapshot - goes through
//! this trait, supplied at driver construction. A capability the embedding
//! host does not offer returns [`CapabilityError::Unsupported`], which the
//! driver logs and treats as a no-op; nothing here can crash dispatch.

use serde_json::Value;
use thiserror::Error;

use crate::registry::PeerSnapshot;
use tether_proto::{
    AccentColor, AppEntry, MediaState, NotificationItem, PeerId, WallpaperSource,
};

/// Result alias for capability calls.
pub type CapResult<T> = Result<T, CapabilityError>;

/// Errors a capability call can produce.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The embedding host does not provide this capability (or has not
    /// wired it up yet). The command becomes a logged no-op; for the
    /// peer-list hook specifically, the driver retries on the next tick.
    #[error("capability not supported by this host")]
    Unsupported,

    /// The capability exists but the operation failed transiently.
    ///
    /// Image-bearing paths degrade the affected field to null; command
    /// paths log and no-op.
    #[error("capability failed: {0}")]
    Failed(String),
}

/// Host-visible notices the driver surfaces through the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNotice {
    /// A companion completed the emoji challenge.
    PairingSucceeded {
        /// Device name from the captured profile.
        device_name: String,
    },
    /// A companion answered the challenge incorrectly; the credential was
    /// rotated.
    PairingFailed {
        /// Device name from the candidate profile.
        device_name: String,
    },
}

/// Capabilities the embedding host exposes to the session manager.
///
/// Setter methods mutate host state; getter methods feed the state
/// synchronizer's snapshots. Default implementations return
/// [`CapabilityError::Unsupported`] so an embedding host only implements
/// what it actually offers.
pub trait HostCapabilities {
    // ── Setting sinks ───────────────────────────────────────────────

    /// Set screen brightness in `[0.0, 1.0]`.
    fn set_brightness(&mut self, _value: f64) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Set color temperature in `[0.0, 1.0]`.
    fn set_temperature(&mut self, _value: f64) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Set an arbitrary named setting.
    fn set_setting(&mut self, _key: &str, _value: &Value) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Toggle blackout mode.
    fn toggle_sleep(&mut self) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Toggle the quick-settings panel.
    fn toggle_quick_settings(&mut self) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Media transport control (`play`, `pause`, `next`, ...).
    fn media_control(&mut self, _action: &str) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Launch an app; `silent` launches without focus.
    fn launch_app(&mut self, _name: &str, _silent: bool) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Speak or display an announcement.
    fn announce(&mut self, _text: &str) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Dismiss all active notifications.
    fn clear_notifications(&mut self) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Return the shell to its home view.
    fn go_home(&mut self) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Forward an interaction into a running app's message boundary,
    /// scoped to that app's origin.
    fn app_action(&mut self, _app_name: &str, _id: &str, _value: Option<&Value>) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Forward uploaded data; `sender` identifies the peer for a
    /// correlated response later.
    fn handle_upload(&mut self, _sender: &PeerId, _payload: &Value) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    /// Switch the active wallpaper.
    fn set_wallpaper(&mut self, _index: usize) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }

    // ── Captures ────────────────────────────────────────────────────

    /// Capture a composite screenshot (shell plus app layers).
    fn capture_composite(&mut self) -> CapResult<Vec<u8>> {
        Err(CapabilityError::Unsupported)
    }

    /// Generic screen capture, the fallback when no composite capability
    /// exists.
    fn capture_screen(&mut self) -> CapResult<Vec<u8>> {
        Err(CapabilityError::Unsupported)
    }

    // ── Snapshot getters ────────────────────────────────────────────

    /// Current screen brightness.
    fn brightness(&self) -> CapResult<f64> {
        Err(CapabilityError::Unsupported)
    }

    /// Current color temperature.
    fn color_temperature(&self) -> CapResult<f64> {
        Err(CapabilityError::Unsupported)
    }

    /// Current media session, if any.
    fn media_state(&self) -> CapResult<Option<MediaState>> {
        Err(CapabilityError::Unsupported)
    }

    /// Active notifications.
    fn notifications(&self) -> CapResult<Vec<NotificationItem>> {
        Err(CapabilityError::Unsupported)
    }

    /// Host accent color.
    fn accent_color(&self) -> CapResult<AccentColor> {
        Err(CapabilityError::Unsupported)
    }

    /// Free-form system status object.
    fn system_status(&self) -> CapResult<Value> {
        Err(CapabilityError::Unsupported)
    }

    /// Full settings object, answering `getAllSettings`.
    fn all_settings(&self) -> CapResult<Value> {
        Err(CapabilityError::Unsupported)
    }

    /// Widget snapshots for the heavy state wave.
    fn widget_snapshots(&self) -> CapResult<Value> {
        Err(CapabilityError::Unsupported)
    }

    /// Raw bytes of the currently active wallpaper, if readable.
    fn current_wallpaper(&self) -> CapResult<Option<Vec<u8>>> {
        Err(CapabilityError::Unsupported)
    }

    /// Wallpaper history for the `wallpaperList` response.
    fn wallpaper_sources(&self) -> CapResult<Vec<WallpaperSource>> {
        Err(CapabilityError::Unsupported)
    }

    /// Installed applications (unfiltered; the synchronizer excludes the
    /// shell's own reserved name).
    fn installed_apps(&self) -> CapResult<Vec<AppEntry>> {
        Err(CapabilityError::Unsupported)
    }

    // ── UI collaborator ─────────────────────────────────────────────

    /// Notify the host UI that the connected-peer list changed.
    ///
    /// Returning [`CapabilityError::Unsupported`] marks the hook as not
    /// wired up yet; the driver retries on the next tick instead of
    /// dropping the notification.
    fn peers_changed(&mut self, _peers: &[PeerSnapshot]) -> CapResult<()> {
        Err(CapabilityError::Unsupported)
    }
}
