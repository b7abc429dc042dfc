use std::time::Duration;

use tracing::debug;

use super::controller::{PlaybackController, Toggle};
use super::popout::LaunchContext;
use super::state::Role;

pub const DEFAULT_AUTOPLAY_DELAY: Duration = Duration::from_millis(1500);

/// One deferred play attempt per mount.
#[derive(Debug)]
pub struct AutoplayBootstrap {
    delay: Duration,
    armed: bool,
}

impl AutoplayBootstrap {
    pub fn new(delay: Duration, enabled: bool) -> Self {
        Self {
            delay,
            armed: enabled,
        }
    }

    /// A popout resuming a handoff restarts at once; a cold mount waits `cold_delay`.
    pub fn for_launch(launch: &LaunchContext, cold_delay: Duration) -> Self {
        let delay = match launch.role {
            Role::Popout => Duration::ZERO,
            Role::Primary => cold_delay,
        };
        Self::new(delay, launch.autoplay)
    }

    /// The delay to wait before [`Self::fire`]. Yields a value at most once.
    pub fn take_delay(&mut self) -> Option<Duration> {
        std::mem::take(&mut self.armed).then_some(self.delay)
    }

    /// Mirrors never autoplay; they would start the remote player on their own mount.
    pub fn fire(controller: &mut PlaybackController) -> Option<Toggle> {
        if controller.state().is_playing || !controller.is_authoritative() {
            debug!(role = controller.role().as_str(), "skipping autoplay");
            return None;
        }
        if controller.has_pending_attempt() {
            return None;
        }
        Some(controller.toggle())
    }
}
