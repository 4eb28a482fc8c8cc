//! Fixed-rate tick scheduling
//!
//! The platform calls [`Scheduler::on_frame`] once per display frame. At most
//! one tick is issued per frame; the sub-interval remainder is carried into
//! the next baseline so the average tick rate tracks the target.

use std::time::{Duration, Instant};

/// Paces the coordinator's `tick` export against a target interval
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    last_tick: Instant,
    ticks: u64,
}

impl Scheduler {
    /// Create a scheduler whose baseline starts at `start`
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_tick: start,
            ticks: 0,
        }
    }

    /// Create a scheduler for a target rate in frames per second
    pub fn with_rate(rate: u32, start: Instant) -> Self {
        let rate = rate.max(1);
        Self::new(Duration::from_secs(1) / rate, start)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_tick(&self) -> Instant {
        self.last_tick
    }

    /// Number of ticks issued so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Decide whether this frame ticks
    ///
    /// Returns the elapsed time to report to the tick when the interval has
    /// been exceeded, and rebases the baseline to `now - (elapsed mod interval)`.
    /// Returns `None` without touching any state otherwise.
    pub fn on_frame(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed <= self.interval {
            return None;
        }

        let interval_nanos = self.interval.as_nanos().max(1);
        let remainder = Duration::from_nanos((elapsed.as_nanos() % interval_nanos) as u64);
        self.last_tick = now - remainder;
        self.ticks += 1;
        Some(elapsed)
    }

    /// Run one frame, invoking `tick` with the elapsed milliseconds when due
    ///
    /// A failing tick is reported once and abandoned; the baseline has
    /// already advanced, so the next frame is scheduled normally.
    pub fn drive<F>(&mut self, now: Instant, tick: F) -> Option<anyhow::Result<()>>
    where
        F: FnOnce(f32) -> anyhow::Result<()>,
    {
        let elapsed = self.on_frame(now)?;
        let result = tick(elapsed.as_secs_f32() * 1000.0);
        if let Err(e) = &result {
            tracing::error!(tick = self.ticks, "tick abandoned: {:#}", e);
        }
        Some(result)
    }
}
