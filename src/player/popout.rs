//! Popout Lifecycle Manager - opens the detached mini-player and tracks its window.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::controller::PlaybackController;
use super::error::PopoutError;
use super::state::{PlaybackState, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopoutLayout {
    /// Stable target name so repeated opens reuse one window.
    pub window_name: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PopoutLayout {
    fn default() -> Self {
        Self {
            window_name: "REP_Player".to_string(),
            width: 360,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopoutRequest {
    pub url: String,
    pub name: String,
    pub features: String,
}

pub trait PopoutWindow {
    fn is_closed(&self) -> bool;
    fn focus(&self);
}

pub trait WindowHost {
    fn screen_size(&self) -> Option<(f64, f64)>;
    /// `None` when the open was blocked.
    fn open(&self, request: &PopoutRequest) -> Option<Box<dyn PopoutWindow>>;
}

/// Features string for `window.open`, centered when the screen size is known.
pub fn window_features(layout: &PopoutLayout, screen: Option<(f64, f64)>) -> String {
    let (width, height) = (layout.width as f64, layout.height as f64);
    let mut features = format!("width={},height={}", layout.width, layout.height);
    if let Some((screen_width, screen_height)) = screen {
        let left = (screen_width / 2.0 - width / 2.0).max(0.0).round() as i64;
        let top = (screen_height / 2.0 - height / 2.0).max(0.0).round() as i64;
        features.push_str(&format!(",left={left},top={top}"));
    }
    features.push_str(",status=no");
    features
}

/// State the primary passes to the popout through its URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PopoutHandoff {
    /// The primary was playing right before it detached.
    pub resume: bool,
    pub volume: f64,
}

impl PopoutHandoff {
    pub fn to_query(&self) -> String {
        format!(
            "mode=player&resume={}&volume={:.2}",
            u8::from(self.resume),
            self.volume
        )
    }
}

/// How this context was launched, read from `location.search`.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchContext {
    pub role: Role,
    pub initial: PlaybackState,
    pub autoplay: bool,
}

impl LaunchContext {
    pub fn from_query(query: &str, default_volume: f64) -> Self {
        let mut mode = None;
        let mut resume = false;
        let mut volume = default_volume;

        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value).unwrap_or(Cow::Borrowed(value));
            match key {
                "mode" => mode = Some(value.into_owned()),
                "resume" => resume = value == "1" || value == "true",
                "volume" => volume = value.parse().unwrap_or(default_volume),
                _ => {}
            }
        }

        if mode.as_deref() == Some("player") {
            Self {
                role: Role::Popout,
                initial: PlaybackState::detached(volume),
                autoplay: resume,
            }
        } else {
            Self {
                role: Role::Primary,
                initial: PlaybackState {
                    volume: default_volume,
                    ..PlaybackState::default()
                },
                autoplay: true,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopoutStatus {
    Idle,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopoutOpened {
    Opened,
    Refocused,
}

/// Owns the popout window handle on the primary side.
pub struct PopoutManager {
    host: Box<dyn WindowHost>,
    layout: PopoutLayout,
    base_url: String,
    window: Option<Box<dyn PopoutWindow>>,
}

impl PopoutManager {
    /// `base_url` is the page's origin plus path, without a query.
    pub fn new(host: Box<dyn WindowHost>, layout: PopoutLayout, base_url: impl Into<String>) -> Self {
        Self {
            host,
            layout,
            base_url: base_url.into(),
            window: None,
        }
    }

    pub fn status(&self) -> PopoutStatus {
        match &self.window {
            None => PopoutStatus::Idle,
            Some(window) if window.is_closed() => PopoutStatus::Closed,
            Some(_) => PopoutStatus::Open,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.window.is_some()
    }

    pub fn open(
        &mut self,
        controller: &mut PlaybackController,
    ) -> Result<PopoutOpened, PopoutError> {
        if controller.role() != Role::Primary {
            return Err(PopoutError::NotPrimary);
        }

        if self.status() == PopoutStatus::Open {
            if let Some(window) = &self.window {
                window.focus();
            }
            if !controller.state().is_popup_active {
                controller.detach();
            }
            return Ok(PopoutOpened::Refocused);
        }

        let handoff = PopoutHandoff {
            resume: controller.state().is_playing,
            volume: controller.state().volume,
        };
        let request = PopoutRequest {
            url: format!("{}?{}", self.base_url, handoff.to_query()),
            name: self.layout.window_name.clone(),
            features: window_features(&self.layout, self.host.screen_size()),
        };

        let Some(window) = self.host.open(&request) else {
            warn!(window = %request.name, "popout window was blocked");
            return Err(PopoutError::Blocked);
        };
        self.window = Some(window);
        // Same turn as window.open, so the popout cannot mount before this lands.
        controller.detach();
        info!(window = %request.name, resume = handoff.resume, "popout opened");
        Ok(PopoutOpened::Opened)
    }

    /// Reclaim authority when the window died without announcing it.
    /// Returns true when authority was reclaimed.
    pub fn check_liveness(&mut self, controller: &mut PlaybackController) -> bool {
        if self.status() != PopoutStatus::Closed {
            return false;
        }
        self.window = None;
        if !controller.state().is_popup_active {
            return false;
        }
        warn!("popout closed without announcing, reclaiming playback");
        controller.reclaim_authority();
        controller.broadcast_state();
        true
    }

    /// Drop the handle after the popout announced its own closure.
    pub fn forget(&mut self) {
        self.window = None;
    }
}
