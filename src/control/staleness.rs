//! # Staleness Supervisor
//!
//! Tracks when the last valid sample arrived and reports the signal stale
//! once the configured grace period has passed without a new one.

use std::time::{Duration, Instant};

/// Default grace period without samples before the signal is stale.
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Bounded-staleness tracker for the sample feed.
///
/// Reports stale until the first sample has been recorded.
#[derive(Debug, Clone)]
pub struct StalenessSupervisor {
    timeout: Duration,
    last_sample_at: Option<Instant>,
}

impl Default for StalenessSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIMEOUT)
    }
}

impl StalenessSupervisor {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_sample_at: None,
        }
    }

    /// Records the arrival time of a valid sample.
    pub fn on_sample(&mut self, now: Instant) {
        self.last_sample_at = Some(now);
    }

    /// Returns `true` if more than the timeout has elapsed since the last sample.
    #[must_use]
    pub fn tick(&self, now: Instant) -> bool {
        match self.last_sample_at {
            Some(last) => now.saturating_duration_since(last) > self.timeout,
            None => true,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn last_sample_at(&self) -> Option<Instant> {
        self.last_sample_at
    }
}
