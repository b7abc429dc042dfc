use serde::{Deserialize, Serialize};

pub const DEFAULT_VOLUME: f64 = 0.8;

/// Which instance of the player a browsing context hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Embedded in the main page.
    Primary,
    /// The detached mini-player window.
    Popout,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Popout => "popout",
        }
    }
}

/// Playback replica mirrored across every live context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub volume: f64,
    pub is_popup_active: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            volume: DEFAULT_VOLUME,
            is_popup_active: false,
        }
    }
}

impl PlaybackState {
    /// Initial replica of a freshly opened popout. It owns the audio but has not
    /// started it yet.
    pub fn detached(volume: f64) -> Self {
        Self {
            is_playing: false,
            volume: clamp_volume(volume).unwrap_or(DEFAULT_VOLUME),
            is_popup_active: true,
        }
    }

    /// Whether a context of `role` drives real audio under this state.
    pub fn is_authoritative_for(&self, role: Role) -> bool {
        match role {
            Role::Primary => !self.is_popup_active,
            Role::Popout => self.is_popup_active,
        }
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.volume = clamp_volume(self.volume).unwrap_or(DEFAULT_VOLUME);
        self
    }
}

/// Clamp into `[0, 1]`; `None` for NaN or infinities.
pub fn clamp_volume(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}
