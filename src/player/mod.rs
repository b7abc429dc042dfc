//! Cross-context playback synchronization for the live stream player.

pub mod audio;
pub mod autoplay;
pub mod channel;
pub mod controller;
pub mod error;
pub mod media_session;
pub mod message;
pub mod popout;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use audio::AudioOutput;
pub use autoplay::{AutoplayBootstrap, DEFAULT_AUTOPLAY_DELAY};
pub use channel::{join, ChannelConnector, ChannelTransport, MemoryBus, SyncInbox, SyncPublisher};
pub use controller::{PlayAttempt, PlaybackController, Toggle};
pub use error::{DecodeError, PlaybackError, PopoutError, SyncError};
pub use media_session::{Artwork, MediaSessionBridge, NowPlayingSurface, TrackMetadata, TransportAction};
pub use message::{Envelope, SyncMessage};
pub use popout::{
    window_features, LaunchContext, PopoutHandoff, PopoutLayout, PopoutManager, PopoutOpened,
    PopoutRequest, PopoutStatus, PopoutWindow, WindowHost,
};
pub use session::{Capabilities, PlayerCommand, PlayerHandle, PlayerSession, Timer};
pub use state::{clamp_volume, PlaybackState, Role, DEFAULT_VOLUME};
