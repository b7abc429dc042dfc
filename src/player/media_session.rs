//! Media Session Bridge - mirrors playback into the platform's now-playing surface.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub artwork: Vec<Artwork>,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            title: "RADIO ELECTRO PARIS LIVE".to_string(),
            artist: "Le son des dj's de Paris".to_string(),
            artwork: vec![Artwork {
                src: "https://i.postimg.cc/FKXmZXkt/cb4ad0-41d2ca721e9a46fd825dc25a4e2c8a97-mv2-png.avif"
                    .to_string(),
                sizes: "512x512".to_string(),
                mime_type: "image/avif".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Play,
    Pause,
}

impl TransportAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportAction::Play => "play",
            TransportAction::Pause => "pause",
        }
    }
}

/// OS/browser now-playing integration.
pub trait NowPlayingSurface {
    fn set_metadata(&self, metadata: &TrackMetadata);
    fn set_playback_state(&self, playing: bool);
    fn set_action_handler(&self, action: TransportAction, handler: Rc<dyn Fn()>);
}

/// Stateless bridge; a missing surface turns every call into a no-op.
#[derive(Clone)]
pub struct MediaSessionBridge {
    surface: Option<Rc<dyn NowPlayingSurface>>,
    metadata: TrackMetadata,
}

impl MediaSessionBridge {
    pub fn new(surface: Option<Rc<dyn NowPlayingSurface>>, metadata: TrackMetadata) -> Self {
        Self { surface, metadata }
    }

    pub fn unavailable() -> Self {
        Self::new(None, TrackMetadata::default())
    }

    #[cfg(test)]
    pub fn is_available(&self) -> bool {
        self.surface.is_some()
    }

    /// Route the platform's play/pause buttons into `on_action`.
    pub fn install_transport(&self, on_action: Rc<dyn Fn(TransportAction)>) {
        let Some(surface) = &self.surface else {
            return;
        };
        for action in [TransportAction::Play, TransportAction::Pause] {
            let on_action = on_action.clone();
            surface.set_action_handler(action, Rc::new(move || on_action(action)));
        }
    }

    pub fn sync(&self, playing: bool) {
        if let Some(surface) = &self.surface {
            surface.set_metadata(&self.metadata);
            surface.set_playback_state(playing);
        }
    }
}
