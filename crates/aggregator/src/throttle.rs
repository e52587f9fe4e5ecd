//! Presentation throttle.

use std::time::{Duration, Instant};

/// Default minimum time between two presentations
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(200);

/// Rate limiter for snapshot presentation
///
/// Emits only when the interval elapsed AND the aggregator generation
/// advanced since the last emission. The first window starts at construction.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_emit: Instant,
    last_generation: u64,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    /// Throttle whose first window opens at `start`
    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_emit: start,
            last_generation: 0,
        }
    }

    /// Decide whether to present now; records the emission on yes
    pub fn should_emit(&mut self, now: Instant, generation: u64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_emit);
        if elapsed < self.interval || generation == self.last_generation {
            return false;
        }

        self.last_emit = now;
        self.last_generation = generation;
        true
    }

    /// Final emission on shutdown: ignores the interval, still requires a
    /// generation not presented yet
    pub fn flush(&mut self, now: Instant, generation: u64) -> bool {
        if generation == self.last_generation {
            return false;
        }

        self.last_emit = now;
        self.last_generation = generation;
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}
