//! Playback Controller - the per-context state machine.
//!
//! Two orthogonal axes: Stopped/Playing and Authoritative/Mirror. Only the
//! authoritative context touches real audio; a mirror forwards intent and
//! applies whatever snapshots the authoritative peer broadcasts.

use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

use super::audio::AudioOutput;
use super::channel::SyncPublisher;
use super::error::PlaybackError;
use super::media_session::MediaSessionBridge;
use super::message::SyncMessage;
use super::state::{clamp_volume, PlaybackState, Role};

/// An outstanding `play()` call. Feed its outcome back through
/// [`PlaybackController::settle_play`] with the same `id`.
pub struct PlayAttempt {
    pub id: u64,
    pub outcome: LocalBoxFuture<'static, Result<(), PlaybackError>>,
}

pub enum Toggle {
    /// Sent `CMD_TOGGLE_PLAY` to the authoritative peer.
    Forwarded,
    Paused,
    Starting(PlayAttempt),
    /// Retired the outstanding attempt before it settled.
    Cancelled,
}

impl Toggle {
    pub fn into_attempt(self) -> Option<PlayAttempt> {
        match self {
            Toggle::Starting(attempt) => Some(attempt),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Toggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Toggle::Forwarded => f.write_str("Forwarded"),
            Toggle::Paused => f.write_str("Paused"),
            Toggle::Starting(attempt) => write!(f, "Starting({})", attempt.id),
            Toggle::Cancelled => f.write_str("Cancelled"),
        }
    }
}

pub struct PlaybackController {
    role: Role,
    state: PlaybackState,
    stream_url: String,
    audio: Box<dyn AudioOutput>,
    media: MediaSessionBridge,
    publisher: SyncPublisher,
    next_attempt: u64,
    pending: Option<u64>,
}

impl PlaybackController {
    pub fn new(
        role: Role,
        initial: PlaybackState,
        stream_url: impl Into<String>,
        audio: Box<dyn AudioOutput>,
        media: MediaSessionBridge,
        publisher: SyncPublisher,
    ) -> Self {
        let state = initial.normalized();
        audio.set_volume(state.volume);
        Self {
            role,
            state,
            stream_url: stream_url.into(),
            audio,
            media,
            publisher,
            next_attempt: 1,
            pending: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_authoritative(&self) -> bool {
        self.state.is_authoritative_for(self.role)
    }

    pub fn has_pending_attempt(&self) -> bool {
        self.pending.is_some()
    }

    #[cfg(test)]
    pub fn publisher(&self) -> &SyncPublisher {
        &self.publisher
    }

    pub fn toggle(&mut self) -> Toggle {
        if !self.is_authoritative() {
            self.publish(SyncMessage::CmdTogglePlay);
            return Toggle::Forwarded;
        }

        if let Some(id) = self.pending.take() {
            debug!(role = self.role.as_str(), attempt = id, "cancelling pending play");
            self.audio.pause();
            return Toggle::Cancelled;
        }

        if self.state.is_playing {
            self.audio.pause();
            self.state.is_playing = false;
            self.media.sync(false);
            self.broadcast_state();
            return Toggle::Paused;
        }

        let id = self.next_attempt;
        self.next_attempt += 1;
        self.pending = Some(id);
        // Re-assigning the source on every start rejoins the live edge.
        self.audio.set_source(&self.stream_url);
        self.audio.set_volume(self.state.volume);
        debug!(role = self.role.as_str(), attempt = id, "starting playback");
        Toggle::Starting(PlayAttempt {
            id,
            outcome: self.audio.play(),
        })
    }

    /// Returns true when the state changed.
    pub fn settle_play(&mut self, id: u64, outcome: Result<(), PlaybackError>) -> bool {
        if self.pending != Some(id) {
            debug!(role = self.role.as_str(), attempt = id, "ignoring stale play outcome");
            if outcome.is_ok() && self.pending.is_none() && !self.state.is_playing {
                self.audio.pause();
            }
            return false;
        }
        self.pending = None;

        match outcome {
            Ok(()) if self.is_authoritative() => {
                self.state.is_playing = true;
                self.media.sync(true);
                self.broadcast_state();
                true
            }
            Ok(()) => {
                self.audio.pause();
                false
            }
            Err(err) => {
                warn!(role = self.role.as_str(), attempt = id, reason = %err, "autoplay blocked or playback error");
                self.state.is_playing = false;
                false
            }
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        let Some(volume) = clamp_volume(volume) else {
            return;
        };
        self.state.volume = volume;
        self.audio.set_volume(volume);
        self.broadcast_state();
    }

    /// Apply a message from another context. A remote toggle request that this
    /// context executes comes back as `Some(Toggle)`.
    pub fn apply_remote(&mut self, message: SyncMessage) -> Option<Toggle> {
        match message {
            SyncMessage::StateUpdate(snapshot) => {
                self.state = snapshot.normalized();
                self.audio.set_volume(self.state.volume);
                if !self.is_authoritative() {
                    self.pending = None;
                    self.audio.pause();
                }
                self.media.sync(self.state.is_playing);
                None
            }
            SyncMessage::CmdTogglePlay if self.is_authoritative() => Some(self.toggle()),
            SyncMessage::CmdTogglePlay => None,
            SyncMessage::PopupClosed => {
                if self.role == Role::Primary {
                    self.reclaim_authority();
                }
                None
            }
        }
    }

    /// Hand the audio over to a popout that has just been opened.
    pub fn detach(&mut self) {
        self.pending = None;
        self.audio.pause();
        self.state.is_playing = false;
        self.state.is_popup_active = true;
        self.media.sync(false);
        self.broadcast_state();
    }

    /// Take authority back after the popout went away. Never resumes audio.
    pub fn reclaim_authority(&mut self) {
        self.pending = None;
        self.audio.pause();
        self.state.is_popup_active = false;
        self.state.is_playing = false;
        self.media.sync(false);
    }

    pub fn broadcast_state(&self) {
        self.publish(SyncMessage::StateUpdate(self.state.clone()));
    }

    pub fn shutdown(&mut self) {
        self.pending = None;
        self.publisher.leave();
    }

    fn publish(&self, message: SyncMessage) {
        if let Err(err) = self.publisher.publish(&message) {
            warn!(role = self.role.as_str(), kind = message.kind(), %err, "sync publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::channel::{join, MemoryBus, SyncInbox};
    use crate::player::testing::{AudioCall, RecordingSurface, ScriptedAudio};
    use crate::player::TrackMetadata;
    use futures_util::FutureExt;
    use std::rc::Rc;

    const CHANNEL: &str = "rep_player_sync";
    const STREAM: &str = "https://stream.example/live";

    struct Fixture {
        controller: PlaybackController,
        audio: ScriptedAudio,
        surface: Rc<RecordingSurface>,
        peer: SyncInbox,
        peer_publisher: crate::player::SyncPublisher,
    }

    fn fixture(role: Role, initial: PlaybackState) -> Fixture {
        let bus = MemoryBus::new();
        let (publisher, _own) = join(&bus, CHANNEL).unwrap();
        let (peer_publisher, peer) = join(&bus, CHANNEL).unwrap();
        let audio = ScriptedAudio::default();
        let surface = Rc::new(RecordingSurface::default());
        let media = MediaSessionBridge::new(Some(surface.clone()), TrackMetadata::default());
        let controller = PlaybackController::new(
            role,
            initial,
            STREAM,
            Box::new(audio.clone()),
            media,
            publisher,
        );
        Fixture {
            controller,
            audio,
            surface,
            peer,
            peer_publisher,
        }
    }

    fn run_toggle(controller: &mut PlaybackController) {
        if let Some(attempt) = controller.toggle().into_attempt() {
            let outcome = attempt
                .outcome
                .now_or_never()
                .expect("scripted audio is ready");
            controller.settle_play(attempt.id, outcome);
        }
    }

    #[test]
    fn successful_start_plays_and_broadcasts() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());

        run_toggle(&mut fx.controller);

        assert!(fx.controller.state().is_playing);
        assert_eq!(
            fx.audio.calls()[..3],
            [
                AudioCall::Volume(0.8),
                AudioCall::SetSource(STREAM.to_string()),
                AudioCall::Volume(0.8),
            ]
        );
        assert_eq!(fx.audio.play_count(), 1);
        assert_eq!(*fx.surface.states.borrow(), vec![true]);
        assert_eq!(
            fx.peer.drain(),
            vec![SyncMessage::StateUpdate(PlaybackState {
                is_playing: true,
                ..PlaybackState::default()
            })]
        );
    }

    #[test]
    fn rejected_start_stays_stopped_without_broadcast() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());
        fx.audio.reject_next("NotAllowedError");

        run_toggle(&mut fx.controller);

        assert!(!fx.controller.state().is_playing);
        assert!(!fx.controller.has_pending_attempt());
        assert!(fx.peer.drain().is_empty());
        assert!(fx.surface.states.borrow().is_empty());
    }

    #[test]
    fn pause_from_playing() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());
        run_toggle(&mut fx.controller);
        fx.peer.drain();

        assert!(matches!(fx.controller.toggle(), Toggle::Paused));
        assert!(!fx.controller.state().is_playing);
        assert_eq!(fx.audio.pause_count(), 1);
        assert_eq!(fx.surface.states.borrow().last(), Some(&false));
        assert_eq!(
            fx.peer.drain(),
            vec![SyncMessage::StateUpdate(PlaybackState::default())]
        );
    }

    #[test]
    fn mirror_forwards_toggle_without_touching_audio() {
        let mut fx = fixture(Role::Primary, PlaybackState::detached(0.8));

        assert!(matches!(fx.controller.toggle(), Toggle::Forwarded));
        assert_eq!(fx.audio.play_count(), 0);
        assert_eq!(fx.audio.pause_count(), 0);
        assert_eq!(fx.peer.drain(), vec![SyncMessage::CmdTogglePlay]);
    }

    #[test]
    fn toggle_during_pending_attempt_cancels_it() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());

        let first = fx.controller.toggle().into_attempt().unwrap();
        assert!(matches!(fx.controller.toggle(), Toggle::Cancelled));

        // The first attempt resolves late; it must not flip the state.
        assert!(!fx.controller.settle_play(first.id, Ok(())));
        assert!(!fx.controller.state().is_playing);
        assert_eq!(fx.audio.pause_count(), 2);
        assert!(fx.peer.drain().is_empty());
    }

    #[test]
    fn late_rejection_does_not_clobber_newer_success() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());

        let first = fx.controller.toggle().into_attempt().unwrap();
        fx.controller.toggle();
        let second = fx.controller.toggle().into_attempt().unwrap();
        assert!(fx.controller.settle_play(second.id, Ok(())));
        assert!(!fx.controller.settle_play(
            first.id,
            Err(PlaybackError::Rejected("AbortError".into()))
        ));

        assert!(fx.controller.state().is_playing);
    }

    #[test]
    fn state_update_overwrites_and_is_not_echoed() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());
        let snapshot = PlaybackState {
            is_playing: true,
            volume: 0.3,
            is_popup_active: true,
        };

        assert!(fx
            .controller
            .apply_remote(SyncMessage::StateUpdate(snapshot.clone()))
            .is_none());

        assert_eq!(fx.controller.state(), &snapshot);
        assert!(!fx.controller.is_authoritative());
        assert_eq!(fx.audio.last_volume(), Some(0.3));
        assert!(fx.peer.drain().is_empty());
    }

    #[test]
    fn becoming_a_mirror_silences_local_audio() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());
        let attempt = fx.controller.toggle().into_attempt().unwrap();

        fx.controller
            .apply_remote(SyncMessage::StateUpdate(PlaybackState::detached(0.8)));

        assert!(!fx.controller.has_pending_attempt());
        assert_eq!(fx.audio.pause_count(), 1);
        // The pending start lands after the handover and is paused again.
        assert!(!fx.controller.settle_play(attempt.id, Ok(())));
        assert_eq!(fx.audio.pause_count(), 2);
    }

    #[test]
    fn remote_toggle_runs_only_on_the_authoritative_side() {
        let mut authoritative = fixture(Role::Popout, PlaybackState::detached(0.8));
        let toggle = authoritative
            .controller
            .apply_remote(SyncMessage::CmdTogglePlay);
        assert!(matches!(toggle, Some(Toggle::Starting(_))));

        let mut mirror = fixture(Role::Primary, PlaybackState::detached(0.8));
        assert!(mirror
            .controller
            .apply_remote(SyncMessage::CmdTogglePlay)
            .is_none());
        assert!(mirror.peer.drain().is_empty());
    }

    #[test]
    fn popup_closed_reclaims_without_resuming() {
        let mut fx = fixture(
            Role::Primary,
            PlaybackState {
                is_playing: true,
                volume: 0.6,
                is_popup_active: true,
            },
        );

        fx.controller.apply_remote(SyncMessage::PopupClosed);

        assert_eq!(
            fx.controller.state(),
            &PlaybackState {
                is_playing: false,
                volume: 0.6,
                is_popup_active: false,
            }
        );
        assert!(fx.controller.is_authoritative());
        assert_eq!(fx.audio.play_count(), 0);
        assert!(fx.peer.drain().is_empty());
    }

    #[test]
    fn popout_ignores_popup_closed() {
        let mut fx = fixture(Role::Popout, PlaybackState::detached(0.8));
        fx.controller.apply_remote(SyncMessage::PopupClosed);
        assert!(fx.controller.state().is_popup_active);
    }

    #[test]
    fn volume_is_applied_and_broadcast() {
        let mut fx = fixture(Role::Primary, PlaybackState::detached(0.8));

        fx.controller.set_volume(0.25);
        fx.controller.set_volume(f64::NAN);
        fx.controller.set_volume(3.0);

        assert_eq!(fx.controller.state().volume, 1.0);
        assert_eq!(fx.audio.last_volume(), Some(1.0));
        let volumes: Vec<f64> = fx
            .peer
            .drain()
            .into_iter()
            .filter_map(|message| match message {
                SyncMessage::StateUpdate(state) => Some(state.volume),
                _ => None,
            })
            .collect();
        assert_eq!(volumes, vec![0.25, 1.0]);
    }

    #[test]
    fn detach_pauses_before_handing_over() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());
        run_toggle(&mut fx.controller);
        fx.peer.drain();

        fx.controller.detach();

        assert_eq!(
            fx.controller.state(),
            &PlaybackState {
                is_playing: false,
                volume: 0.8,
                is_popup_active: true,
            }
        );
        assert_eq!(fx.audio.calls().last(), Some(&AudioCall::Pause));
        assert_eq!(
            fx.peer.drain(),
            vec![SyncMessage::StateUpdate(fx.controller.state().clone())]
        );
    }

    #[test]
    fn shutdown_leaves_the_channel() {
        let mut fx = fixture(Role::Primary, PlaybackState::default());
        fx.controller.shutdown();
        fx.controller.shutdown();

        assert!(fx.controller.publisher().is_closed());
        fx.controller.set_volume(0.1);
        assert!(fx.peer.drain().is_empty());
        assert!(!fx.peer_publisher.is_closed());
    }
}
