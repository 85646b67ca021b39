use crate::clock::Clock;
use crate::rate;
use crate::summary::Summary;

/// State of a single copy operation.
///
/// The start time is captured once on creation. The byte counter only moves forward, one byte
/// at a time, after the byte has been written to the sink.
#[derive(Debug)]
pub struct TransferSession<C: Clock> {
    clock: C,
    start_time: std::time::Duration,
    bytes_sent: u64,
    target_rate: u64,
    waits: u64,
}

impl<C: Clock> TransferSession<C> {
    pub fn start(clock: C, target_rate: u64) -> Self {
        let start_time = clock.now();
        Self {
            clock,
            start_time,
            bytes_sent: 0,
            target_rate,
            waits: 0,
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.clock.now().saturating_sub(self.start_time)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn current_rate(&self) -> f64 {
        rate::estimate(self.elapsed(), self.bytes_sent)
    }

    pub fn rate_exceeded(&self) -> bool {
        rate::exceeds(self.elapsed(), self.bytes_sent, self.target_rate)
    }

    /// Time left until the average rate drops back to the target, zero if it already has.
    pub fn time_until_allowed(&self) -> std::time::Duration {
        rate::earliest_allowed(self.bytes_sent, self.target_rate).saturating_sub(self.elapsed())
    }

    pub fn record_wait(&mut self) {
        self.waits += 1;
    }

    pub fn record_bytes(&mut self, count: u64) {
        self.bytes_sent += count;
    }

    pub fn summary(&self) -> Summary {
        Summary {
            bytes_copied: self.bytes_sent,
            elapsed: self.elapsed(),
            target_rate: self.target_rate,
            waits: self.waits,
        }
    }
}
