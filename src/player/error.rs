use thiserror::Error;

/// Failures of the sync channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("failed to join channel `{channel}`: {reason}")]
    Join { channel: String, reason: String },
    #[error("channel has been left")]
    Closed,
    #[error("failed to post frame: {0}")]
    Post(String),
}

/// Why the audio output refused to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Autoplay policy, network or decode failure reported by the element.
    #[error("playback rejected: {0}")]
    Rejected(String),
    #[error("audio output unavailable on this platform")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PopoutError {
    #[error("popout window was blocked")]
    Blocked,
    #[error("only the primary player can open a popout")]
    NotPrimary,
}

/// A frame that could not be turned into a [`crate::player::SyncMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("unknown message kind `{0}`")]
    UnknownKind(String),
    #[error("message kind `{0}` requires a payload")]
    MissingPayload(&'static str),
}
