//! Host-to-peer messages.
//!
//! Unlike the open inbound envelope, the outbound vocabulary is closed and
//! fully typed: the host controls it, so every message is a variant of
//! [`HostMessage`] with an internally tagged `type` field matching the wire
//! names companions expect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::ProtoError,
    types::{AppEntry, HostStateSnapshot, MediaState, NotificationItem, WallpaperThumb},
};

/// Why an authentication attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
    /// The greeting carried no usable device profile.
    ProfileMissing,
    /// The emoji challenge was answered incorrectly.
    ChallengeFailed,
    /// The challenge expired before it was answered.
    ChallengeExpired,
    /// The host operator rejected the pairing attempt.
    Rejected,
}

/// Logical channel a message travels on.
///
/// Both channels are multiplexed on the same transport; the split lets a
/// runtime prioritize command responses over bulk state broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Authentication and command/response traffic.
    Command,
    /// State snapshots and facet broadcasts.
    State,
}

/// All messages the host sends to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    /// Greeting accepted via the pre-shared key fast path.
    #[serde(rename = "welcome")]
    Welcome {
        /// Name the host registered the peer under.
        #[serde(rename = "deviceName")]
        device_name: String,
    },

    /// Emoji challenge issued to an unrecognized peer.
    #[serde(rename = "challenge")]
    Challenge {
        /// Sixteen distinct emoji; exactly one is the answer shown on the
        /// host screen.
        options: Vec<String>,
    },

    /// Challenge passed; the peer now holds the PSK for future greetings.
    #[serde(rename = "authorized")]
    Authorized {
        /// The pre-shared key.
        psk: String,
        /// Name the host registered the peer under.
        #[serde(rename = "deviceName")]
        device_name: String,
    },

    /// Authentication refused.
    #[serde(rename = "auth_failed")]
    AuthFailed {
        /// Refusal reason, when one is disclosed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<AuthFailureReason>,
    },

    /// Discovery is disabled and the greeting carried no valid PSK.
    #[serde(rename = "discovery_disabled")]
    DiscoveryDisabled,

    /// Full host-state snapshot.
    #[serde(rename = "state")]
    State {
        /// The snapshot.
        data: HostStateSnapshot,
    },

    /// Installed-application list.
    #[serde(rename = "appList")]
    AppList {
        /// Applications, launcher's own entry excluded.
        data: Vec<AppEntry>,
    },

    /// Wallpaper thumbnail list.
    #[serde(rename = "wallpaperList")]
    WallpaperList {
        /// One entry per selectable wallpaper.
        data: Vec<WallpaperThumb>,
    },

    /// Current wallpaper image (compressed data URI), or `None` if
    /// unreadable.
    #[serde(rename = "wallpaperUpdate")]
    WallpaperUpdate {
        /// Compressed wallpaper image.
        data: Option<String>,
    },

    /// Widget snapshot broadcast.
    #[serde(rename = "widgetUpdate")]
    WidgetUpdate {
        /// Free-form widget snapshot payload.
        data: Value,
    },

    /// Active app UI descriptor; `None` tells peers to fall back to the
    /// default view.
    #[serde(rename = "appUI")]
    AppUi {
        /// The descriptor, replayed verbatim to late joiners.
        data: Option<Value>,
    },

    /// Incremental update to the active app UI.
    #[serde(rename = "appUIUpdate")]
    AppUiUpdate {
        /// Free-form update payload.
        data: Value,
    },

    /// Notification list broadcast.
    #[serde(rename = "notificationUpdate")]
    NotificationUpdate {
        /// Active notifications.
        data: Vec<NotificationItem>,
    },

    /// Media session broadcast.
    #[serde(rename = "mediaUpdate")]
    MediaUpdate {
        /// Current media session, if any.
        data: Option<MediaState>,
    },

    /// A live activity began on the host.
    #[serde(rename = "liveActivityStart")]
    LiveActivityStart {
        /// Free-form live-activity payload.
        data: Value,
    },

    /// Screenshot response; `None` when capture failed transiently.
    #[serde(rename = "screenshot")]
    Screenshot {
        /// Captured image as a data URI.
        data: Option<String>,
    },

    /// Full settings object, answering `getAllSettings`.
    #[serde(rename = "settingsData")]
    SettingsData {
        /// Free-form settings payload.
        data: Value,
    },

    /// Host-initiated upload prompt, correlating an earlier `uploadData`.
    #[serde(rename = "requestUpload")]
    RequestUpload {
        /// Free-form upload descriptor.
        data: Value,
    },
}

impl HostMessage {
    /// Encode the message to JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        serde_json::to_vec(self).map_err(ProtoError::Encode)
    }

    /// Decode a message from JSON bytes (used by companion-side code and
    /// the test harness).
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtoError> {
        serde_json::from_slice(bytes).map_err(ProtoError::Decode)
    }

    /// Wire name of this message's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Challenge { .. } => "challenge",
            Self::Authorized { .. } => "authorized",
            Self::AuthFailed { .. } => "auth_failed",
            Self::DiscoveryDisabled => "discovery_disabled",
            Self::State { .. } => "state",
            Self::AppList { .. } => "appList",
            Self::WallpaperList { .. } => "wallpaperList",
            Self::WallpaperUpdate { .. } => "wallpaperUpdate",
            Self::WidgetUpdate { .. } => "widgetUpdate",
            Self::AppUi { .. } => "appUI",
            Self::AppUiUpdate { .. } => "appUIUpdate",
            Self::NotificationUpdate { .. } => "notificationUpdate",
            Self::MediaUpdate { .. } => "mediaUpdate",
            Self::LiveActivityStart { .. } => "liveActivityStart",
            Self::Screenshot { .. } => "screenshot",
            Self::SettingsData { .. } => "settingsData",
            Self::RequestUpload { .. } => "requestUpload",
        }
    }

    /// Which logical channel this message travels on.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Welcome { .. }
            | Self::Challenge { .. }
            | Self::Authorized { .. }
            | Self::AuthFailed { .. }
            | Self::DiscoveryDisabled
            | Self::WallpaperList { .. }
            | Self::Screenshot { .. }
            | Self::SettingsData { .. }
            | Self::RequestUpload { .. } => Channel::Command,

            Self::State { .. }
            | Self::AppList { .. }
            | Self::WallpaperUpdate { .. }
            | Self::WidgetUpdate { .. }
            | Self::AppUi { .. }
            | Self::AppUiUpdate { .. }
            | Self::NotificationUpdate { .. }
            | Self::MediaUpdate { .. }
            | Self::LiveActivityStart { .. } => Channel::State,
        }
    }
}
