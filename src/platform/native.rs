// Desktop fallbacks: no audio element, no popout windows, contexts share an in-process bus.
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::{ready, LocalBoxFuture};
use futures_util::FutureExt;

use crate::player::{AudioOutput, Capabilities, MemoryBus, PlaybackError, Timer};

thread_local! {
    static LOCAL_BUS: MemoryBus = MemoryBus::new();
}

pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed_local()
    }
}

/// Accepts every call and refuses to start.
pub struct SilentAudio;

impl AudioOutput for SilentAudio {
    fn set_source(&self, _url: &str) {}

    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlaybackError>> {
        ready(Err(PlaybackError::Unsupported)).boxed_local()
    }

    fn pause(&self) {}

    fn set_volume(&self, _volume: f64) {}
}

pub fn connector() -> MemoryBus {
    LOCAL_BUS.with(MemoryBus::clone)
}

pub fn capabilities() -> Capabilities {
    Capabilities {
        audio: Box::new(SilentAudio),
        now_playing: None,
        windows: None,
        timer: timer(),
        base_url: String::new(),
    }
}

pub fn timer() -> Rc<dyn Timer> {
    Rc::new(TokioTimer)
}

/// `REP_PLAYER_QUERY` lets a desktop build start in popout mode.
pub fn launch_query() -> String {
    std::env::var("REP_PLAYER_QUERY").unwrap_or_default()
}

pub fn page_origin() -> Option<String> {
    std::env::var("REP_SITE_ORIGIN")
        .ok()
        .filter(|origin| !origin.trim().is_empty())
}

pub fn on_page_hide(_callback: impl Fn() + 'static) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::channel::join;

    #[tokio::test]
    async fn silent_audio_refuses_to_play() {
        assert_eq!(SilentAudio.play().await, Err(PlaybackError::Unsupported));
    }

    #[test]
    fn connector_is_shared_per_thread() {
        let (_publisher, _inbox) = join(&connector(), "rep_player_sync").unwrap();
        assert_eq!(connector().subscriber_count("rep_player_sync"), 1);
    }
}
