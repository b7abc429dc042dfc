use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::player::{PopoutLayout, TrackMetadata, DEFAULT_VOLUME};

pub const DEFAULT_APP_NAME: &str = "Radio Electro Paris";
pub const DEFAULT_CHANNEL_NAME: &str = "rep_player_sync";
pub const DEFAULT_STREAM_URL: &str = "/stream/live";
/// Centova Cast account whose current song the overlay widget shows.
pub const DEFAULT_STREAMINFO_USERNAME: &str = "radioelec";

/// Player settings. Every field has a default so a partial `player` object in
/// the site feed overrides only what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    pub stream_url: String,
    pub channel_name: String,
    pub popout: PopoutLayout,
    pub autoplay_delay_ms: u64,
    pub liveness_poll_ms: u64,
    pub default_volume: f64,
    pub metadata: TrackMetadata,
    pub streaminfo_username: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            popout: PopoutLayout::default(),
            autoplay_delay_ms: 1500,
            liveness_poll_ms: 1000,
            default_volume: DEFAULT_VOLUME,
            metadata: TrackMetadata::default(),
            streaminfo_username: DEFAULT_STREAMINFO_USERNAME.to_string(),
        }
    }
}

/// Older site feeds stored volume as a percentage.
fn normalize_volume(mut value: f64) -> f64 {
    if !value.is_finite() {
        return DEFAULT_VOLUME;
    }
    let mut passes = 0;
    while value > 1.0 && passes < 4 {
        value /= 100.0;
        passes += 1;
    }
    value.clamp(0.0, 1.0)
}

impl PlayerConfig {
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        self.default_volume = normalize_volume(self.default_volume);
        if self.stream_url.trim().is_empty() {
            self.stream_url = defaults.stream_url;
        }
        if self.channel_name.trim().is_empty() {
            self.channel_name = defaults.channel_name;
        }
        if self.streaminfo_username.trim().is_empty() {
            self.streaminfo_username = defaults.streaminfo_username;
        }
        if self.popout.window_name.trim().is_empty() {
            self.popout.window_name = defaults.popout.window_name;
        }
        self.popout.width = self.popout.width.max(200);
        self.popout.height = self.popout.height.max(200);
        self.liveness_poll_ms = self.liveness_poll_ms.max(100);
        self
    }

    pub fn autoplay_delay(&self) -> Duration {
        Duration::from_millis(self.autoplay_delay_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_poll_ms)
    }
}
