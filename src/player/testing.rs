// In-crate doubles for the capability traits.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures_util::future::{ready, LocalBoxFuture};
use futures_util::FutureExt;

use super::audio::AudioOutput;
use super::error::PlaybackError;
use super::media_session::{NowPlayingSurface, TrackMetadata, TransportAction};
use super::popout::{PopoutRequest, PopoutWindow, WindowHost};

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    SetSource(String),
    Play,
    Pause,
    Volume(f64),
}

#[derive(Default)]
struct AudioLog {
    calls: RefCell<Vec<AudioCall>>,
    outcomes: RefCell<VecDeque<Result<(), PlaybackError>>>,
}

/// Records every call; `play()` succeeds unless a rejection was queued.
#[derive(Clone, Default)]
pub struct ScriptedAudio {
    log: Rc<AudioLog>,
}

impl ScriptedAudio {
    pub fn reject_next(&self, reason: &str) {
        self.log
            .outcomes
            .borrow_mut()
            .push_back(Err(PlaybackError::Rejected(reason.to_string())));
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.log.calls.borrow().clone()
    }

    pub fn play_count(&self) -> usize {
        self.count(|call| matches!(call, AudioCall::Play))
    }

    pub fn pause_count(&self) -> usize {
        self.count(|call| matches!(call, AudioCall::Pause))
    }

    pub fn last_volume(&self) -> Option<f64> {
        self.log.calls.borrow().iter().rev().find_map(|call| match call {
            AudioCall::Volume(volume) => Some(*volume),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&AudioCall) -> bool) -> usize {
        self.log.calls.borrow().iter().filter(|c| predicate(c)).count()
    }
}

impl AudioOutput for ScriptedAudio {
    fn set_source(&self, url: &str) {
        self.log
            .calls
            .borrow_mut()
            .push(AudioCall::SetSource(url.to_string()));
    }

    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlaybackError>> {
        self.log.calls.borrow_mut().push(AudioCall::Play);
        let outcome = self.log.outcomes.borrow_mut().pop_front().unwrap_or(Ok(()));
        ready(outcome).boxed_local()
    }

    fn pause(&self) {
        self.log.calls.borrow_mut().push(AudioCall::Pause);
    }

    fn set_volume(&self, volume: f64) {
        self.log.calls.borrow_mut().push(AudioCall::Volume(volume));
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    pub metadata: RefCell<Option<TrackMetadata>>,
    pub states: RefCell<Vec<bool>>,
    handlers: RefCell<Vec<(TransportAction, Rc<dyn Fn()>)>>,
}

impl RecordingSurface {
    pub fn press(&self, action: TransportAction) {
        let handler = self
            .handlers
            .borrow()
            .iter()
            .find(|(registered, _)| *registered == action)
            .map(|(_, handler)| handler.clone());
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl NowPlayingSurface for RecordingSurface {
    fn set_metadata(&self, metadata: &TrackMetadata) {
        *self.metadata.borrow_mut() = Some(metadata.clone());
    }

    fn set_playback_state(&self, playing: bool) {
        self.states.borrow_mut().push(playing);
    }

    fn set_action_handler(&self, action: TransportAction, handler: Rc<dyn Fn()>) {
        let mut handlers = self.handlers.borrow_mut();
        handlers.retain(|(registered, _)| *registered != action);
        handlers.push((action, handler));
    }
}

#[derive(Default)]
pub struct FakeWindowState {
    pub closed: Cell<bool>,
    pub focus_count: Cell<u32>,
}

struct FakeWindow(Rc<FakeWindowState>);

impl PopoutWindow for FakeWindow {
    fn is_closed(&self) -> bool {
        self.0.closed.get()
    }

    fn focus(&self) {
        self.0.focus_count.set(self.0.focus_count.get() + 1);
    }
}

pub struct FakeWindowHost {
    pub screen: Option<(f64, f64)>,
    pub blocked: Cell<bool>,
    pub requests: RefCell<Vec<PopoutRequest>>,
    pub window: Rc<FakeWindowState>,
}

impl FakeWindowHost {
    pub fn new(screen: Option<(f64, f64)>) -> Rc<Self> {
        Rc::new(Self {
            screen,
            blocked: Cell::new(false),
            requests: RefCell::new(Vec::new()),
            window: Rc::new(FakeWindowState::default()),
        })
    }
}

impl WindowHost for Rc<FakeWindowHost> {
    fn screen_size(&self) -> Option<(f64, f64)> {
        self.screen
    }

    fn open(&self, request: &PopoutRequest) -> Option<Box<dyn PopoutWindow>> {
        self.requests.borrow_mut().push(request.clone());
        if self.blocked.get() {
            return None;
        }
        self.window.closed.set(false);
        Some(Box::new(FakeWindow(self.window.clone())))
    }
}
