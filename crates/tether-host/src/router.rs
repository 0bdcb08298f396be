//! Command dispatch.
//!
//! Maps parsed [`Command`]s onto capability calls and response actions.
//! Dispatch never fails: unknown command types are ignored (forward
//! compatibility with newer companions), malformed payloads no-op the one
//! affected handler, and a capability the host does not provide is a
//! logged no-op.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    capabilities::{CapResult, CapabilityError, HostCapabilities},
    driver::{HostAction, HostDriver},
    env::Environment,
    storage::KvStore,
    sync,
};
use tether_proto::{Command, HostMessage, ParseOutcome, PeerId};

/// Log a command-sink outcome. `Unsupported` is routine (not every host
/// wires every capability); `Failed` is worth a warning.
fn note(result: CapResult<()>, kind: &str) {
    match result {
        Ok(()) => {},
        Err(CapabilityError::Unsupported) => {
            debug!(kind, "capability not wired up, ignoring command");
        },
        Err(CapabilityError::Failed(reason)) => warn!(kind, %reason, "command failed"),
    }
}

impl<E: Environment, C: HostCapabilities, K: KvStore> HostDriver<E, C, K> {
    pub(crate) fn dispatch(&mut self, peer_id: &PeerId, outcome: ParseOutcome) -> Vec<HostAction> {
        let command = match outcome {
            ParseOutcome::Command(command) => command,
            ParseOutcome::Malformed { kind } => {
                debug!(%peer_id, %kind, "malformed command payload, ignoring");
                return Vec::new();
            },
            ParseOutcome::Unknown => {
                debug!(%peer_id, "unknown command type, ignoring");
                return Vec::new();
            },
        };

        match command {
            // Liveness was already refreshed when the frame arrived.
            Command::Ping => Vec::new(),

            Command::SetBrightness { value } => {
                note(self.caps.set_brightness(value.clamp(0.0, 1.0)), "setBrightness");
                Vec::new()
            },
            Command::SetTemperature { value } => {
                note(self.caps.set_temperature(value.clamp(0.0, 1.0)), "setTemperature");
                Vec::new()
            },
            Command::SetSetting { key, value } => {
                note(self.caps.set_setting(&key, &value), "setSetting");
                Vec::new()
            },
            Command::ToggleSleep => {
                note(self.caps.toggle_sleep(), "toggleSleep");
                Vec::new()
            },
            Command::ToggleQuickSettings => {
                note(self.caps.toggle_quick_settings(), "toggleQS");
                Vec::new()
            },
            Command::Media { action } => {
                note(self.caps.media_control(&action), "media");
                Vec::new()
            },
            Command::LaunchApp { name } => {
                note(self.caps.launch_app(&name, false), "launchApp");
                Vec::new()
            },
            Command::LaunchAppSilently { name } => {
                note(self.caps.launch_app(&name, true), "launchAppSilently");
                Vec::new()
            },
            Command::Announce { text } => {
                note(self.caps.announce(&text), "announce");
                Vec::new()
            },
            Command::Home => {
                note(self.caps.go_home(), "home");
                Vec::new()
            },
            Command::AppAction { app_name, id, value } => {
                note(self.caps.app_action(&app_name, &id, value.as_ref()), "appAction");
                Vec::new()
            },
            Command::UploadData { payload } => {
                note(self.caps.handle_upload(peer_id, &payload), "uploadData");
                Vec::new()
            },

            Command::ClearNotifications => match self.caps.clear_notifications() {
                Ok(()) => vec![HostAction::Broadcast {
                    message: self.sync.notification_update(&self.caps),
                }],
                Err(err) => {
                    note(Err(err), "clearNotifications");
                    Vec::new()
                },
            },

            Command::GetState => self
                .sync
                .full_state_wave(&self.caps)
                .into_iter()
                .map(|message| HostAction::Send { peer_id: peer_id.clone(), message })
                .collect(),

            Command::GetApps => vec![HostAction::Send {
                peer_id: peer_id.clone(),
                message: self.sync.app_list(&self.caps),
            }],

            Command::GetWallpapers => vec![HostAction::Send {
                peer_id: peer_id.clone(),
                message: self.sync.wallpaper_list(&self.caps),
            }],

            // A successful switch is broadcast to everyone; the sender
            // additionally gets the refreshed list so its active marker
            // moves.
            Command::SetWallpaper { index } => match self.caps.set_wallpaper(index) {
                Ok(()) => vec![
                    HostAction::Broadcast {
                        message: self.sync.wallpaper_update(&self.caps),
                    },
                    HostAction::Send {
                        peer_id: peer_id.clone(),
                        message: self.sync.wallpaper_list(&self.caps),
                    },
                ],
                Err(err) => {
                    note(Err(err), "setWallpaper");
                    Vec::new()
                },
            },

            Command::GetAllSettings => {
                let data = match self.caps.all_settings() {
                    Ok(data) => data,
                    Err(err) => {
                        debug!(%err, "settings unavailable");
                        Value::Null
                    },
                };
                vec![HostAction::Send {
                    peer_id: peer_id.clone(),
                    message: HostMessage::SettingsData { data },
                }]
            },

            Command::RequestScreenshot => {
                let captured = match self.caps.capture_composite() {
                    Err(CapabilityError::Unsupported) => self.caps.capture_screen(),
                    other => other,
                };
                let data = match captured {
                    Ok(bytes) => sync::compress_image(
                        &bytes,
                        self.config.thumbnail_max_width,
                        self.config.thumbnail_quality,
                    ),
                    Err(err) => {
                        debug!(%err, "screenshot capture unavailable");
                        None
                    },
                };
                vec![HostAction::Send {
                    peer_id: peer_id.clone(),
                    message: HostMessage::Screenshot { data },
                }]
            },
        }
    }
}
