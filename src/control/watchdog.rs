//! # Session Watchdog
//!
//! Hard ceiling on continuous thrust. A session opens on a rising edge of
//! the cycle's `active` request and is cut once it has lasted the session
//! limit, whether or not the signal is still fresh.
//!
//! After a trip the watchdog keeps forcing idle for as long as `active`
//! stays set, until the [`RearmPolicy`] is satisfied:
//!
//! - [`RearmPolicy::RisingEdge`]: `active` has to drop and rise again.
//! - [`RearmPolicy::FreshSample`]: any sample accepted after the trip re-arms.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

/// Default maximum length of one session.
pub const DEFAULT_SESSION_LIMIT: Duration = Duration::from_millis(15_000);

/// What has to happen after a trip before thrust may resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    #[default]
    RisingEdge,
    FreshSample,
}

/// Per-cycle decision of the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    Continue,
    /// Cut thrust and show the warning colour.
    ForcedIdle,
}

/// Session bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    /// A session window is open and thrust may be emitted.
    pub armed: bool,
    /// Start of the open session.
    pub started_at: Option<Instant>,
    /// The last cycle requested thrust.
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct SessionWatchdog {
    limit: Duration,
    policy: RearmPolicy,
    state: SessionState,
    tripped: bool,
    rearm_ready: bool,
}

impl Default for SessionWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_LIMIT, RearmPolicy::default())
    }
}

impl SessionWatchdog {
    #[must_use]
    pub fn new(limit: Duration, policy: RearmPolicy) -> Self {
        Self {
            limit,
            policy,
            state: SessionState::default(),
            tripped: false,
            rearm_ready: false,
        }
    }

    /// Notes that a valid sample was accepted.
    ///
    /// Only matters under [`RearmPolicy::FreshSample`] while tripped.
    pub fn on_sample(&mut self) {
        if self.tripped && self.policy == RearmPolicy::FreshSample {
            self.rearm_ready = true;
        }
    }

    /// Advances the watchdog by one control cycle.
    ///
    /// # Arguments
    ///
    /// * `now` - Current monotonic time
    /// * `active` - Whether this cycle requests thrust
    pub fn on_cycle(&mut self, now: Instant, active: bool) -> WatchdogVerdict {
        let was_active = self.state.active;
        self.state.active = active;

        if !active {
            if self.state.armed {
                debug!("Session ended after {:?}", self.elapsed(now).unwrap_or_default());
            }
            self.end_session();
            self.tripped = false;
            self.rearm_ready = false;
            return WatchdogVerdict::Continue;
        }

        if !self.state.armed {
            let rising_edge = !was_active;
            let rearmed = self.tripped && self.rearm_ready;
            if !(rising_edge || rearmed) {
                return WatchdogVerdict::ForcedIdle;
            }

            self.state.armed = true;
            self.state.started_at = Some(now);
            self.tripped = false;
            self.rearm_ready = false;
            info!("Session started, thrust cut in {:?}", self.limit);
        }

        if self.elapsed(now).is_some_and(|elapsed| elapsed >= self.limit) {
            warn!("Session limit of {:?} reached, forcing idle until re-armed", self.limit);
            self.end_session();
            self.tripped = true;
            self.rearm_ready = false;
            return WatchdogVerdict::ForcedIdle;
        }

        WatchdogVerdict::Continue
    }

    /// Time left in the open session, if any.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.elapsed(now)
            .map(|elapsed| self.limit.saturating_sub(elapsed))
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// `true` after a trip until the session is re-armed or the request drops.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.state
            .started_at
            .map(|started| now.saturating_duration_since(started))
    }

    fn end_session(&mut self) {
        self.state.armed = false;
        self.state.started_at = None;
    }
}
