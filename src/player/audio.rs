use futures_util::future::LocalBoxFuture;

use super::error::PlaybackError;

/// The audio element as seen by the playback controller.
pub trait AudioOutput {
    fn set_source(&self, url: &str);
    /// Resolves once playback actually started, or with the reason it was refused.
    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlaybackError>>;
    fn pause(&self);
    fn set_volume(&self, volume: f64);
}
