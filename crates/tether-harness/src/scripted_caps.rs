//! Scripted capability provider.
//!
//! A host-side capability implementation whose observable state is set by
//! the test and whose sink calls are recorded. Handles clone shallowly, so
//! a test keeps one clone to script and inspect while the driver owns the
//! other.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use tether_host::{
    CapabilityError, HostCapabilities, PeerSnapshot, capabilities::CapResult,
};
use tether_proto::{AppEntry, MediaState, NotificationItem, PeerId, WallpaperSource};

/// Scriptable state and call recordings.
#[derive(Debug, Default)]
pub struct ScriptedState {
    /// Whether the peer-list UI hook is wired up.
    pub ui_ready: bool,
    /// Current brightness, if the host exposes it.
    pub brightness: Option<f64>,
    /// Current media session.
    pub media: Option<MediaState>,
    /// Active notifications.
    pub notifications: Vec<NotificationItem>,
    /// Installed applications.
    pub apps: Vec<AppEntry>,
    /// Wallpaper history.
    pub wallpapers: Vec<WallpaperSource>,
    /// Every peer list pushed through the UI hook.
    pub peer_lists: Vec<Vec<PeerSnapshot>>,
    /// Every `(key, value)` passed to the setting sink.
    pub settings_set: Vec<(String, Value)>,
    /// Every upload forwarded, with its sender.
    pub uploads: Vec<(PeerId, Value)>,
    /// Indices passed to the wallpaper switch.
    pub wallpaper_switches: Vec<usize>,
    /// Media transport actions forwarded.
    pub media_controls: Vec<String>,
    /// Every `(app_name, id, value)` routed into an app.
    pub app_actions: Vec<(String, String, Option<Value>)>,
}

/// Capability provider driven by a [`ScriptedState`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedCaps {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedCaps {
    /// A provider with the UI hook ready and everything else unset.
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let caps = Self::default();
        caps.state.lock().expect("state mutex poisoned").ui_ready = true;
        caps
    }

    /// Lock the scripted state for setup or inspection.
    #[allow(clippy::expect_used)]
    pub fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().expect("state mutex poisoned")
    }
}

impl HostCapabilities for ScriptedCaps {
    fn set_brightness(&mut self, value: f64) -> CapResult<()> {
        self.state().brightness = Some(value);
        Ok(())
    }

    fn set_setting(&mut self, key: &str, value: &Value) -> CapResult<()> {
        self.state().settings_set.push((key.to_string(), value.clone()));
        Ok(())
    }

    fn clear_notifications(&mut self) -> CapResult<()> {
        self.state().notifications.clear();
        Ok(())
    }

    fn media_control(&mut self, action: &str) -> CapResult<()> {
        self.state().media_controls.push(action.to_string());
        Ok(())
    }

    fn app_action(&mut self, app_name: &str, id: &str, value: Option<&Value>) -> CapResult<()> {
        self.state().app_actions.push((app_name.to_string(), id.to_string(), value.cloned()));
        Ok(())
    }

    fn handle_upload(&mut self, sender: &PeerId, payload: &Value) -> CapResult<()> {
        self.state().uploads.push((sender.clone(), payload.clone()));
        Ok(())
    }

    fn set_wallpaper(&mut self, index: usize) -> CapResult<()> {
        let mut state = self.state();
        if index >= state.wallpapers.len() {
            return Err(CapabilityError::Failed(format!("no wallpaper at index {index}")));
        }
        for (position, source) in state.wallpapers.iter_mut().enumerate() {
            source.active = position == index;
        }
        state.wallpaper_switches.push(index);
        Ok(())
    }

    fn brightness(&self) -> CapResult<f64> {
        self.state().brightness.ok_or(CapabilityError::Unsupported)
    }

    fn media_state(&self) -> CapResult<Option<MediaState>> {
        Ok(self.state().media.clone())
    }

    fn notifications(&self) -> CapResult<Vec<NotificationItem>> {
        Ok(self.state().notifications.clone())
    }

    fn installed_apps(&self) -> CapResult<Vec<AppEntry>> {
        Ok(self.state().apps.clone())
    }

    fn wallpaper_sources(&self) -> CapResult<Vec<WallpaperSource>> {
        Ok(self.state().wallpapers.clone())
    }

    fn peers_changed(&mut self, peers: &[PeerSnapshot]) -> CapResult<()> {
        let mut state = self.state();
        if state.ui_ready {
            state.peer_lists.push(peers.to_vec());
            Ok(())
        } else {
            Err(CapabilityError::Unsupported)
        }
    }
}
