//! Monotonic time sources used to measure session duration
//!
//! Rate estimates are only meaningful against a clock that never goes backwards, so all readings
//! are durations since a fixed origin taken from a steady clock. Wall-clock time is never used.

/// Source of monotonic time readings.
pub trait Clock {
    /// Time elapsed since the clock's fixed origin. Successive readings never decrease.
    fn now(&self) -> std::time::Duration;
}

/// Clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> std::time::Duration {
        self.origin.elapsed()
    }
}

/// Clock backed by [`tokio::time::Instant`].
///
/// Follows tokio's paused time in tests, which [`MonotonicClock`] does not.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> std::time::Duration {
        self.origin.elapsed()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> std::time::Duration {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_decreases() {
        let clock = MonotonicClock::new();
        let mut last = clock.now();
        for _ in 0..1000 {
            let now = clock.now();
            assert!(now >= last);
            last = now;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioClock::new();
        assert_eq!(clock.now(), std::time::Duration::ZERO);
        tokio::time::advance(std::time::Duration::from_secs(3)).await;
        assert_eq!(clock.now(), std::time::Duration::from_secs(3));
    }
}
