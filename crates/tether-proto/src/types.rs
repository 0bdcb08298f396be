//! Shared value objects: identifiers, device profiles, and host-state facets.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name used when a peer has not supplied a usable profile yet.
///
/// Placeholder profiles are display-only: they never overwrite a known
/// profile in the registry and are never persisted to the known-devices map.
pub const PLACEHOLDER_DEVICE_NAME: &str = "Unknown device";

/// Opaque transport identifier for a connected peer.
///
/// Assigned by the transport layer (e.g. a data-channel id); the host never
/// interprets its contents, only compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap a transport-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identity a peer presents on every greeting.
///
/// Untrusted until authentication succeeds at least once; remembered by
/// `name` afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Display name chosen on the companion device.
    pub name: String,
    /// Optional blob reference (URL or data URI) for the device avatar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl DeviceProfile {
    /// Profile with just a name and no avatar.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), avatar: None }
    }

    /// Stand-in profile for a peer that has not identified itself.
    pub fn placeholder() -> Self {
        Self::named(PLACEHOLDER_DEVICE_NAME)
    }

    /// Whether this profile carries no real identity.
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() || self.name == PLACEHOLDER_DEVICE_NAME
    }
}

/// Accent color as an RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccentColor(pub [u8; 3]);

/// Playback metadata for the currently active media session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaState {
    /// Track or stream title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Artist or source name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Whether playback is currently running.
    pub playing: bool,
    /// Playback position in seconds, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_secs: Option<f64>,
    /// Track duration in seconds, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

/// One active notification mirrored to companions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItem {
    /// Host-assigned notification id.
    pub id: String,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    #[serde(default)]
    pub body: String,
    /// Originating application name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Unix timestamp (seconds) when the notification was posted.
    pub posted_at_secs: u64,
}

/// One installed application as presented to companions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    /// Application display name.
    pub name: String,
    /// Optional icon reference (URL or data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Kind of a wallpaper history entry.
///
/// Only still images get thumbnails; video and slideshow entries are skipped
/// when building the wallpaper list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperKind {
    /// A still image.
    Image,
    /// A video wallpaper.
    Video,
    /// A rotating slideshow.
    Slideshow,
}

/// A wallpaper history entry as supplied by the host capability provider.
///
/// `bytes` is the full-size source image; the host compresses it into a
/// thumbnail before it crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperSource {
    /// Position in the wallpaper history.
    pub index: usize,
    /// What kind of wallpaper this is.
    pub kind: WallpaperKind,
    /// Raw image bytes, if readable.
    pub bytes: Option<Vec<u8>>,
    /// Whether this entry is the currently active wallpaper.
    pub active: bool,
}

/// One entry of the `wallpaperList` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperThumb {
    /// Position in the wallpaper history.
    pub index: usize,
    /// JPEG thumbnail as a data URI. `None` when generation failed - the
    /// entry is still listed so the peer can select it blind.
    pub thumbnail: Option<String>,
    /// Whether this entry is the currently active wallpaper.
    pub active: bool,
}

/// Point-in-time view of host-exposed state.
///
/// Recomputed from the capability provider at every push; a field whose
/// getter is unavailable or failed degrades to `None`/empty rather than
/// failing the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStateSnapshot {
    /// Screen brightness in `[0.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    /// Color temperature in `[0.0, 1.0]` (0 = neutral, 1 = warmest).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temperature: Option<f64>,
    /// Current media session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaState>,
    /// Active notifications.
    #[serde(default)]
    pub notifications: Vec<NotificationItem>,
    /// Active app UI descriptor (free-form, replayed verbatim).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_ui: Option<Value>,
    /// Host accent color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<AccentColor>,
    /// Free-form system status object.
    #[serde(default)]
    pub system_status: Value,
}
