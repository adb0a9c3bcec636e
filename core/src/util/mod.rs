mod element;
mod runnable;

pub use element::*;
pub use runnable::*;

use std::cell::Cell;
use std::time::*;

/// An interval timer driven by caller-supplied instants.
///
/// The loop owns the clock: every check receives `now` explicitly, which keeps
/// cadence decisions deterministic under test.
pub struct Timer {
    start: Cell<Instant>,
    interval: Duration,
}

impl Timer {
    pub fn starting_at(start: Instant, interval: Duration) -> Self {
        Self {
            start: Cell::new(start),
            interval,
        }
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start.get())
    }

    /// Returns `true` and restarts the timer once at least one interval has
    /// passed since the last restart.
    pub fn is_time_out_at(&self, now: Instant) -> bool {
        if self.elapsed_at(now) >= self.interval {
            self.start.set(now);
            return true;
        }

        false
    }
}
