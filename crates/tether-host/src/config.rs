//! Host driver configuration.

use std::time::Duration;

/// Default lifetime of an unanswered emoji challenge.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(120);

/// Default longest-edge bound for compressed images.
pub const DEFAULT_THUMBNAIL_MAX_WIDTH: u32 = 640;

/// Default JPEG quality for compressed images.
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 75;

/// Reserved name of the host shell itself; filtered out of app lists so a
/// companion never launches the launcher it is already remote-controlling.
pub const DEFAULT_SHELL_APP_NAME: &str = "Tether";

/// Tunables for the host session manager.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// How long an unanswered challenge stays valid. Expired challenges are
    /// dropped on tick; a late answer fails without rotating the credential.
    pub challenge_ttl: Duration,
    /// Longest-edge bound applied when compressing wallpapers/thumbnails.
    pub thumbnail_max_width: u32,
    /// JPEG quality (1-100) for compressed images.
    pub thumbnail_quality: u8,
    /// The launcher's own reserved name, excluded from `getApps` responses.
    pub shell_app_name: String,
    /// Whether discovery (interactive pairing) starts enabled.
    pub discovery_default: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            thumbnail_max_width: DEFAULT_THUMBNAIL_MAX_WIDTH,
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
            shell_app_name: DEFAULT_SHELL_APP_NAME.to_string(),
            discovery_default: true,
        }
    }
}
