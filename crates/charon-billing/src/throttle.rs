//! Adaptive request throttling shared across concurrent charges.
//!
//! The level is a congestion heuristic in the additive-increase /
//! additive-decrease family: every network failure raises it one
//! step, every provider response lowers it one step. Callers insert
//! `current_delay()` of pacing wherever they are about to hit the
//! provider. The value is advisory; a momentarily stale read is fine,
//! only the `[0, max_level]` bound is kept exact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_MAX_THROTTLE: u64 = 5;
pub const DEFAULT_THROTTLE_MULTIPLIER_MS: u64 = 7;

#[derive(Debug)]
pub struct ThrottleController {
    level: AtomicU64,
    max_level: u64,
    multiplier_ms: u64,
}

impl ThrottleController {
    pub fn new(max_level: u64, multiplier_ms: u64) -> Self {
        Self {
            level: AtomicU64::new(0),
            max_level,
            multiplier_ms,
        }
    }

    /// Delay callers should apply before the next provider request:
    /// `level * multiplier` milliseconds.
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.level.load(Ordering::Relaxed) * self.multiplier_ms)
    }

    /// Raise the backoff level one step, saturating at `max_level`.
    pub fn on_failure(&self) {
        let _ = self
            .level
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |level| {
                (level < self.max_level).then_some(level + 1)
            });
    }

    /// Lower the backoff level one step, floored at zero. Called on
    /// any provider response, on the assumption the provider has had
    /// room to recover.
    pub fn on_success(&self) {
        let _ = self
            .level
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |level| {
                (level > 0).then(|| level - 1)
            });
    }

    pub fn level(&self) -> u64 {
        self.level.load(Ordering::Relaxed)
    }
}

impl Default for ThrottleController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_THROTTLE, DEFAULT_THROTTLE_MULTIPLIER_MS)
    }
}
