//! Session runtime - one cooperative event loop per browsing context.
//!
//! The loop owns the controller and multiplexes UI commands, inbound sync
//! messages, outstanding play attempts, the autoplay timer and the popout
//! liveness tick. Play attempts live in a `FuturesUnordered`, so a slow
//! `play()` never blocks the next toggle.

use std::rc::Rc;
use std::time::Duration;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::future::{Fuse, FusedFuture, LocalBoxFuture};
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use super::audio::AudioOutput;
use super::autoplay::AutoplayBootstrap;
use super::channel::{self, ChannelConnector, SyncInbox, SyncPublisher};
use super::controller::{PlaybackController, Toggle};
use super::error::{PlaybackError, SyncError};
use super::media_session::{MediaSessionBridge, NowPlayingSurface, TransportAction};
use super::message::SyncMessage;
use super::popout::{LaunchContext, PopoutManager, WindowHost};
use super::state::{PlaybackState, Role};
use crate::config::PlayerConfig;

pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Toggle,
    Transport(TransportAction),
    SetVolume(f64),
    OpenPopout,
    Shutdown,
}

/// Platform capabilities handed to a session.
pub struct Capabilities {
    pub audio: Box<dyn AudioOutput>,
    pub now_playing: Option<Rc<dyn NowPlayingSurface>>,
    /// `None` where popouts cannot be opened.
    pub windows: Option<Box<dyn WindowHost>>,
    pub timer: Rc<dyn Timer>,
    /// Origin plus path of the current page, used to build the popout URL.
    pub base_url: String,
}

type SettledAttempt = LocalBoxFuture<'static, (u64, Result<(), PlaybackError>)>;

pub struct PlayerSession {
    controller: PlaybackController,
    inbox: SyncInbox,
    commands: UnboundedReceiver<PlayerCommand>,
    attempts: FuturesUnordered<SettledAttempt>,
    autoplay: AutoplayBootstrap,
    popouts: Option<PopoutManager>,
    timer: Rc<dyn Timer>,
    liveness_interval: Duration,
    observer: Option<Box<dyn FnMut(&PlaybackState)>>,
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct PlayerHandle {
    role: Role,
    commands: UnboundedSender<PlayerCommand>,
    publisher: SyncPublisher,
}

impl PlayerSession {
    pub fn start(
        launch: &LaunchContext,
        config: &PlayerConfig,
        connector: &dyn ChannelConnector,
        capabilities: Capabilities,
    ) -> Result<(Self, PlayerHandle), SyncError> {
        let (publisher, inbox) = channel::join(connector, &config.channel_name)?;
        let (command_tx, commands) = unbounded();

        let media = MediaSessionBridge::new(capabilities.now_playing, config.metadata.clone());
        let transport_tx = command_tx.clone();
        media.install_transport(Rc::new(move |action| {
            if transport_tx.unbounded_send(PlayerCommand::Transport(action)).is_err() {
                debug!(action = action.as_str(), "transport action after session stopped");
            }
        }));

        let controller = PlaybackController::new(
            launch.role,
            launch.initial.clone(),
            config.stream_url.clone(),
            capabilities.audio,
            media,
            publisher.clone(),
        );
        if launch.role == Role::Popout {
            // Tabs that missed the primary's detach broadcast learn about us here.
            controller.broadcast_state();
        }

        let popouts = match (launch.role, capabilities.windows) {
            (Role::Primary, Some(host)) => Some(PopoutManager::new(
                host,
                config.popout.clone(),
                capabilities.base_url,
            )),
            _ => None,
        };

        info!(role = launch.role.as_str(), autoplay = launch.autoplay, "player session started");

        let session = Self {
            controller,
            inbox,
            commands,
            attempts: FuturesUnordered::new(),
            autoplay: AutoplayBootstrap::for_launch(launch, config.autoplay_delay()),
            popouts,
            timer: capabilities.timer,
            liveness_interval: config.liveness_interval(),
            observer: None,
        };
        let handle = PlayerHandle {
            role: launch.role,
            commands: command_tx,
            publisher,
        };
        Ok((session, handle))
    }

    /// Called with the current state once when the loop starts and after every change.
    pub fn on_change(mut self, observer: impl FnMut(&PlaybackState) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub async fn run(self) {
        let Self {
            mut controller,
            inbox,
            mut commands,
            mut attempts,
            mut autoplay,
            mut popouts,
            timer,
            liveness_interval,
            mut observer,
        } = self;

        let mut inbox = inbox.into_stream().fuse();
        let mut autoplay_due = match autoplay.take_delay() {
            Some(delay) => timer.sleep(delay).fuse(),
            None => Fuse::terminated(),
        };
        let liveness_tick = |popouts: &Option<PopoutManager>| match popouts {
            Some(_) => timer.sleep(liveness_interval).fuse(),
            None => Fuse::terminated(),
        };
        let mut liveness = liveness_tick(&popouts);

        let mut notify = |state: &PlaybackState| {
            if let Some(observer) = observer.as_mut() {
                observer(state);
            }
        };
        notify(controller.state());

        loop {
            let before = controller.state().clone();
            let mut started = None;

            futures_util::select! {
                command = commands.next() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => started = handle_command(&mut controller, popouts.as_mut(), command),
                },
                message = inbox.next() => {
                    if let Some(message) = message {
                        if message == SyncMessage::PopupClosed {
                            if let Some(popouts) = popouts.as_mut() {
                                popouts.forget();
                            }
                        }
                        started = controller.apply_remote(message);
                    }
                },
                (id, outcome) = attempts.select_next_some() => {
                    controller.settle_play(id, outcome);
                },
                () = autoplay_due => {
                    debug!(role = controller.role().as_str(), "autoplay delay elapsed");
                    started = AutoplayBootstrap::fire(&mut controller);
                },
                () = liveness => {
                    if let Some(popouts) = popouts.as_mut() {
                        popouts.check_liveness(&mut controller);
                    }
                    liveness = liveness_tick(&popouts);
                },
                complete => break,
            }

            if let Some(attempt) = started.and_then(Toggle::into_attempt) {
                let id = attempt.id;
                let outcome = attempt.outcome;
                attempts.push(async move { (id, outcome.await) }.boxed_local());
            }
            if *controller.state() != before {
                notify(controller.state());
            }
        }

        if !autoplay_due.is_terminated() {
            debug!("autoplay cancelled by shutdown");
        }
        controller.shutdown();
        info!(role = controller.role().as_str(), "player session stopped");
    }
}

fn handle_command(
    controller: &mut PlaybackController,
    popouts: Option<&mut PopoutManager>,
    command: PlayerCommand,
) -> Option<Toggle> {
    match command {
        PlayerCommand::Toggle => Some(controller.toggle()),
        PlayerCommand::Transport(action) => {
            let playing = controller.state().is_playing;
            let wanted = match action {
                // A pending start counts as playing: `play` must never cancel it.
                TransportAction::Play => !playing && !controller.has_pending_attempt(),
                TransportAction::Pause => playing || controller.has_pending_attempt(),
            };
            wanted.then(|| controller.toggle())
        }
        PlayerCommand::SetVolume(volume) => {
            controller.set_volume(volume);
            None
        }
        PlayerCommand::OpenPopout => {
            match popouts {
                Some(popouts) => {
                    if let Err(err) = popouts.open(controller) {
                        warn!(%err, "could not open popout");
                    }
                }
                None => warn!(role = controller.role().as_str(), "popout unavailable here"),
            }
            None
        }
        PlayerCommand::Shutdown => None,
    }
}

impl PlayerHandle {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn toggle(&self) {
        self.send(PlayerCommand::Toggle);
    }

    pub fn set_volume(&self, volume: f64) {
        self.send(PlayerCommand::SetVolume(volume));
    }

    pub fn open_popout(&self) {
        self.send(PlayerCommand::OpenPopout);
    }

    /// Leaves the channel right away, even if the loop is no longer polled.
    pub fn shutdown(&self) {
        self.send(PlayerCommand::Shutdown);
        self.publisher.leave();
    }

    /// Page teardown hook. Synchronous: the loop will not get another turn.
    pub fn unload(&self) {
        if self.role == Role::Popout && !self.publisher.is_closed() {
            if let Err(err) = self.publisher.publish(&SyncMessage::PopupClosed) {
                warn!(%err, "failed to announce popout closure");
            }
        }
        self.shutdown();
    }

    fn send(&self, command: PlayerCommand) {
        if self.commands.unbounded_send(command).is_err() {
            debug!("player session already stopped");
        }
    }
}
