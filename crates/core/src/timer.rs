//! Interval timer for periodic frame statistics.

use std::time::{Duration, Instant};

/// Measures elapsed time and fires once per fixed reporting interval.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
    interval: Duration,
}

impl Timer {
    /// Create a timer that fires every `interval`, starting from now.
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            interval,
        }
    }

    /// Total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the time since the previous firing once the interval has passed,
    /// and restarts the interval. Returns `None` before that.
    pub fn tick(&mut self) -> Option<Duration> {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Option<Duration> {
        let since = now.saturating_duration_since(self.last_tick);
        if since < self.interval {
            return None;
        }
        self.last_tick = now;
        Some(since)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
