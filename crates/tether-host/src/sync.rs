//! State synchronizer.
//!
//! Assembles [`HostStateSnapshot`]s from the capability provider and
//! builds the facet broadcast messages. Snapshots are recomputed on every
//! push; a getter that is unavailable or fails degrades its field, never
//! the snapshot. The one piece of state held here is the active app UI
//! descriptor, cached so late-joining peers get an identical replay.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::codecs::jpeg::JpegEncoder;
use serde_json::Value;
use tracing::{debug, warn};

use crate::capabilities::HostCapabilities;
use tether_proto::{
    AppEntry, HostMessage, HostStateSnapshot, WallpaperKind, WallpaperThumb,
};

/// Compress an image for the wire: decode, bound the longest edge to
/// `max_width`, re-encode as JPEG at `quality`, wrap in a data URI.
///
/// Any failure (unknown format, corrupt data, encode error) yields `None`;
/// callers degrade the affected field rather than the whole push.
pub fn compress_image(bytes: &[u8], max_width: u32, quality: u8) -> Option<String> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(err) => {
            warn!(%err, "image decode failed, dropping field");
            return None;
        },
    };

    let bounded = if decoded.width().max(decoded.height()) > max_width {
        decoded.thumbnail(max_width, max_width)
    } else {
        decoded
    };

    // JPEG has no alpha channel.
    let rgb = bounded.to_rgb8();
    let mut encoded = Vec::new();
    if let Err(err) = rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality)) {
        warn!(%err, "image encode failed, dropping field");
        return None;
    }

    Some(format!("data:image/jpeg;base64,{}", BASE64.encode(&encoded)))
}

/// Builds state messages from the capability provider.
#[derive(Debug, Default)]
pub struct Synchronizer {
    /// Longest-edge bound for compressed images.
    max_width: u32,
    /// JPEG quality for compressed images.
    quality: u8,
    /// The launcher's reserved name, excluded from app lists.
    shell_app_name: String,
    /// Active app UI descriptor, replayed to late joiners.
    app_ui: Option<Value>,
}

impl Synchronizer {
    /// Create a synchronizer with the given compression and filter
    /// settings.
    pub fn new(max_width: u32, quality: u8, shell_app_name: impl Into<String>) -> Self {
        Self { max_width, quality, shell_app_name: shell_app_name.into(), app_ui: None }
    }

    /// Record the active app UI descriptor and return its broadcast.
    pub fn set_app_ui(&mut self, descriptor: Value) -> HostMessage {
        self.app_ui = Some(descriptor.clone());
        HostMessage::AppUi { data: Some(descriptor) }
    }

    /// Clear the active app UI and return the explicit-null broadcast that
    /// tells peers to fall back to the default view.
    pub fn clear_app_ui(&mut self) -> HostMessage {
        self.app_ui = None;
        HostMessage::AppUi { data: None }
    }

    /// The cached app UI descriptor, if one is active.
    pub fn app_ui(&self) -> Option<&Value> {
        self.app_ui.as_ref()
    }

    /// Assemble a point-in-time snapshot, degrading per field.
    pub fn snapshot(&self, caps: &impl HostCapabilities) -> HostStateSnapshot {
        HostStateSnapshot {
            brightness: caps.brightness().ok(),
            color_temperature: caps.color_temperature().ok(),
            media: caps.media_state().ok().flatten(),
            notifications: caps.notifications().unwrap_or_default(),
            app_ui: self.app_ui.clone(),
            accent_color: caps.accent_color().ok(),
            system_status: caps.system_status().unwrap_or(Value::Null),
        }
    }

    /// The light `state` message.
    pub fn state_message(&self, caps: &impl HostCapabilities) -> HostMessage {
        HostMessage::State { data: self.snapshot(caps) }
    }

    /// The current wallpaper as a compressed broadcast. A missing or
    /// unreadable wallpaper degrades to `data: None`.
    pub fn wallpaper_update(&self, caps: &impl HostCapabilities) -> HostMessage {
        let data = match caps.current_wallpaper() {
            Ok(Some(bytes)) => compress_image(&bytes, self.max_width, self.quality),
            Ok(None) => None,
            Err(err) => {
                debug!(%err, "current wallpaper unavailable");
                None
            },
        };
        HostMessage::WallpaperUpdate { data }
    }

    /// Thumbnail list of selectable wallpapers.
    ///
    /// Video and slideshow entries are skipped (no still frame to
    /// thumbnail); an entry whose image cannot be compressed is listed with
    /// `thumbnail: None` so the peer can still select it. An empty or
    /// unavailable history yields an empty list.
    pub fn wallpaper_list(&self, caps: &impl HostCapabilities) -> HostMessage {
        let sources = match caps.wallpaper_sources() {
            Ok(sources) => sources,
            Err(err) => {
                debug!(%err, "wallpaper history unavailable");
                Vec::new()
            },
        };

        let data = sources
            .into_iter()
            .filter(|source| source.kind == WallpaperKind::Image)
            .map(|source| WallpaperThumb {
                index: source.index,
                thumbnail: source
                    .bytes
                    .as_deref()
                    .and_then(|bytes| compress_image(bytes, self.max_width, self.quality)),
                active: source.active,
            })
            .collect();
        HostMessage::WallpaperList { data }
    }

    /// Widget snapshot broadcast. Unavailable snapshots degrade to `null`.
    pub fn widget_update(&self, caps: &impl HostCapabilities) -> HostMessage {
        HostMessage::WidgetUpdate { data: caps.widget_snapshots().unwrap_or(Value::Null) }
    }

    /// Installed-app list with the launcher's own entry excluded.
    pub fn app_list(&self, caps: &impl HostCapabilities) -> HostMessage {
        let data: Vec<AppEntry> = caps
            .installed_apps()
            .unwrap_or_default()
            .into_iter()
            .filter(|app| app.name != self.shell_app_name)
            .collect();
        HostMessage::AppList { data }
    }

    /// Notification list broadcast.
    pub fn notification_update(&self, caps: &impl HostCapabilities) -> HostMessage {
        HostMessage::NotificationUpdate { data: caps.notifications().unwrap_or_default() }
    }

    /// Media session broadcast.
    pub fn media_update(&self, caps: &impl HostCapabilities) -> HostMessage {
        HostMessage::MediaUpdate { data: caps.media_state().ok().flatten() }
    }

    /// The ordered full-state wave sent to a newly trusted peer: the light
    /// snapshot first, then the app UI replay and the heavy facets. The
    /// runtime sends these in vector order, so a peer always has the cheap
    /// `state` view before bulk data arrives.
    pub fn full_state_wave(&self, caps: &impl HostCapabilities) -> Vec<HostMessage> {
        let mut wave = vec![self.state_message(caps)];
        if let Some(descriptor) = &self.app_ui {
            wave.push(HostMessage::AppUi { data: Some(descriptor.clone()) });
        }
        wave.push(self.wallpaper_update(caps));
        wave.push(self.widget_update(caps));
        wave.push(self.app_list(caps));
        wave
    }
}
