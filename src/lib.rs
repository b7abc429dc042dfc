//! Cross-context playback synchronization for the REP live stream player.
//!
//! Every browser tab or popout window runs its own [`player::PlayerSession`] and
//! keeps a replica of [`player::PlaybackState`]. Replicas converge by exchanging
//! [`player::SyncMessage`] frames over a named broadcast channel.

pub mod api;
pub mod config;
pub mod platform;
pub mod player;
