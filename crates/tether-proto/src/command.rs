//! Typed commands parsed from inbound frames.
//!
//! Dispatch is a pure lookup on the envelope's `type` string. Parsing is
//! three-way: a well-formed command, a known type with a bad `data` shape
//! (that handler no-ops), or an unknown type (silently ignored for forward
//! compatibility - older hosts must tolerate newer peer commands).

use serde_json::Value;

/// Outcome of parsing an envelope's `(type, data)` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A well-formed command ready for dispatch.
    Command(Command),
    /// A known command type whose `data` did not match the expected shape.
    Malformed {
        /// The command type, for logging.
        kind: String,
    },
    /// A command type this host does not know.
    Unknown,
}

/// Commands a companion peer can issue once authenticated.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Heartbeat; refreshes the sender's liveness timestamp.
    Ping,
    /// Set screen brightness to `value` in `[0.0, 1.0]`.
    SetBrightness {
        /// Requested brightness.
        value: f64,
    },
    /// Set color temperature to `value` in `[0.0, 1.0]`.
    SetTemperature {
        /// Requested temperature.
        value: f64,
    },
    /// Set an arbitrary named host setting.
    SetSetting {
        /// Setting key.
        key: String,
        /// Setting value, passed through verbatim.
        value: Value,
    },
    /// Toggle host blackout mode.
    ToggleSleep,
    /// Request the wallpaper thumbnail list.
    GetWallpapers,
    /// Switch the active wallpaper.
    SetWallpaper {
        /// Index into the wallpaper history.
        index: usize,
    },
    /// Request a full state push (state, app list, wallpaper, widgets).
    GetState,
    /// Request the installed-app list.
    GetApps,
    /// Forward an interaction into a running app's own message boundary.
    AppAction {
        /// Target application name.
        app_name: String,
        /// Element or action id inside the app.
        id: String,
        /// Optional value attached to the action.
        value: Option<Value>,
    },
    /// Forward uploaded data to the host's upload handler.
    UploadData {
        /// Upload payload, passed through verbatim.
        payload: Value,
    },
    /// Request a screenshot of the host display.
    RequestScreenshot,
    /// Media transport control (`play`, `pause`, `next`, ...).
    Media {
        /// Control action name.
        action: String,
    },
    /// Launch an application, bringing it to the foreground.
    LaunchApp {
        /// Application name.
        name: String,
    },
    /// Launch an application without focusing it.
    LaunchAppSilently {
        /// Application name.
        name: String,
    },
    /// Speak or display an announcement on the host.
    Announce {
        /// Announcement text.
        text: String,
    },
    /// Dismiss all active notifications.
    ClearNotifications,
    /// Return the host shell to its home view.
    Home,
    /// Request the full settings object.
    GetAllSettings,
    /// Toggle the quick-settings panel.
    ToggleQuickSettings,
}

impl Command {
    /// Parse a `(type, data)` pair into a command.
    ///
    /// Never panics; bad shapes come back as [`ParseOutcome::Malformed`]
    /// so that one garbled frame cannot take down dispatch for the rest.
    pub fn parse(kind: &str, data: Option<&Value>) -> ParseOutcome {
        let malformed = || ParseOutcome::Malformed { kind: kind.to_string() };

        match kind {
            "ping" => ParseOutcome::Command(Self::Ping),
            "toggleSleep" => ParseOutcome::Command(Self::ToggleSleep),
            "getWallpapers" => ParseOutcome::Command(Self::GetWallpapers),
            "getState" => ParseOutcome::Command(Self::GetState),
            "getApps" => ParseOutcome::Command(Self::GetApps),
            "requestScreenshot" => ParseOutcome::Command(Self::RequestScreenshot),
            "clearNotifications" => ParseOutcome::Command(Self::ClearNotifications),
            "home" => ParseOutcome::Command(Self::Home),
            "getAllSettings" => ParseOutcome::Command(Self::GetAllSettings),
            "toggleQS" => ParseOutcome::Command(Self::ToggleQuickSettings),

            "setBrightness" => match data.and_then(number_field("value")) {
                Some(value) => ParseOutcome::Command(Self::SetBrightness { value }),
                None => malformed(),
            },
            "setTemperature" => match data.and_then(number_field("value")) {
                Some(value) => ParseOutcome::Command(Self::SetTemperature { value }),
                None => malformed(),
            },
            "setSetting" => {
                let key = data.and_then(string_field("key"));
                let value = data.and_then(|d| d.get("value")).cloned();
                match (key, value) {
                    (Some(key), Some(value)) => {
                        ParseOutcome::Command(Self::SetSetting { key, value })
                    },
                    _ => malformed(),
                }
            },
            "setWallpaper" => match data.and_then(|d| d.get("index")).and_then(Value::as_u64) {
                Some(index) => ParseOutcome::Command(Self::SetWallpaper { index: index as usize }),
                None => malformed(),
            },
            "appAction" => {
                let app_name = data.and_then(string_field("appName"));
                let id = data.and_then(string_field("id"));
                match (app_name, id) {
                    (Some(app_name), Some(id)) => ParseOutcome::Command(Self::AppAction {
                        app_name,
                        id,
                        value: data.and_then(|d| d.get("value")).cloned(),
                    }),
                    _ => malformed(),
                }
            },
            "uploadData" => match data {
                Some(payload) => {
                    ParseOutcome::Command(Self::UploadData { payload: payload.clone() })
                },
                None => malformed(),
            },
            "media" => match data.and_then(string_field("action")) {
                Some(action) => ParseOutcome::Command(Self::Media { action }),
                None => malformed(),
            },
            "launchApp" => match data.and_then(string_field("name")) {
                Some(name) => ParseOutcome::Command(Self::LaunchApp { name }),
                None => malformed(),
            },
            "launchAppSilently" => match data.and_then(string_field("name")) {
                Some(name) => ParseOutcome::Command(Self::LaunchAppSilently { name }),
                None => malformed(),
            },
            "announce" => match data.and_then(string_field("text")) {
                Some(text) => ParseOutcome::Command(Self::Announce { text }),
                None => malformed(),
            },

            _ => ParseOutcome::Unknown,
        }
    }
}

fn string_field(name: &'static str) -> impl Fn(&Value) -> Option<String> {
    move |data| data.get(name).and_then(Value::as_str).map(str::to_string)
}

fn number_field(name: &'static str) -> impl Fn(&Value) -> Option<f64> {
    move |data| data.get(name).and_then(Value::as_f64)
}
