use std::time::{Duration, Instant};

/// Monotonic clock measuring wall time between simulation steps.
#[derive(Clone, Copy, Debug)]
pub struct StepClock {
    last: Instant,
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Time since construction or the last reset.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.last.elapsed()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Return the elapsed time and start measuring again.
    pub fn restart(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        dt
    }
}
