// Wire contract shared by every player instance on the channel.
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::DecodeError;
use super::state::PlaybackState;

const STATE_UPDATE: &str = "STATE_UPDATE";
const CMD_TOGGLE_PLAY: &str = "CMD_TOGGLE_PLAY";
const POPUP_CLOSED: &str = "POPUP_CLOSED";

#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    /// Authoritative snapshot after a local state change.
    StateUpdate(PlaybackState),
    /// A mirror asks the authoritative context to toggle playback.
    CmdTogglePlay,
    /// The popout is unloading and hands authority back.
    PopupClosed,
}

impl SyncMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::StateUpdate(_) => STATE_UPDATE,
            SyncMessage::CmdTogglePlay => CMD_TOGGLE_PLAY,
            SyncMessage::PopupClosed => POPUP_CLOSED,
        }
    }
}

/// A message plus the origin tag of the context that published it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: Option<String>,
    pub message: SyncMessage,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    origin: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<Value>,
}

impl Envelope {
    pub fn new(origin: impl Into<String>, message: SyncMessage) -> Self {
        Self {
            origin: Some(origin.into()),
            message,
        }
    }

    pub fn encode(&self) -> String {
        let mut frame = json!({ "type": self.message.kind() });
        if let Some(origin) = &self.origin {
            frame["origin"] = json!(origin);
        }
        if let SyncMessage::StateUpdate(state) = &self.message {
            frame["payload"] = json!(state);
        }
        frame.to_string()
    }

    /// Frames without an origin are accepted; they come from peers that predate
    /// origin tagging.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let raw: RawFrame =
            serde_json::from_str(frame).map_err(|err| DecodeError::Malformed(err.to_string()))?;

        let message = match raw.kind.as_str() {
            STATE_UPDATE => {
                let payload = raw.payload.ok_or(DecodeError::MissingPayload(STATE_UPDATE))?;
                let state: PlaybackState = serde_json::from_value(payload)
                    .map_err(|err| DecodeError::Malformed(err.to_string()))?;
                SyncMessage::StateUpdate(state.normalized())
            }
            CMD_TOGGLE_PLAY => SyncMessage::CmdTogglePlay,
            POPUP_CLOSED => SyncMessage::PopupClosed,
            other => return Err(DecodeError::UnknownKind(other.to_string())),
        };

        Ok(Self {
            origin: raw.origin,
            message,
        })
    }
}
