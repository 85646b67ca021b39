/// Statistics of a finished copy.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub bytes_copied: u64,
    pub elapsed: std::time::Duration,
    /// Target rate in bytes per second, 0 when unthrottled.
    pub target_rate: u64,
    /// Number of times the rate was found above target before emitting a byte.
    pub waits: u64,
}

impl Summary {
    /// Achieved average rate in bytes per second.
    pub fn average_rate(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.bytes_copied as f64 / self.elapsed.as_secs_f64()
    }
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_copied: self.bytes_copied + other.bytes_copied,
            elapsed: self.elapsed + other.elapsed,
            target_rate: std::cmp::max(self.target_rate, other.target_rate),
            waits: self.waits + other.waits,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = if self.target_rate == 0 {
            "unthrottled".to_string()
        } else {
            format!("{}/s", bytesize::ByteSize(self.target_rate))
        };
        // rounded to milliseconds, sub-millisecond noise makes the output unreadable
        let elapsed = std::time::Duration::from_millis(
            u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
        );
        write!(
            f,
            "bytes copied: {}\n\
            elapsed: {}\n\
            average rate: {}/s\n\
            target rate: {}\n\
            waits: {}",
            bytesize::ByteSize(self.bytes_copied),
            humantime::format_duration(elapsed),
            // fractional bytes don't matter for display
            bytesize::ByteSize(self.average_rate() as u64),
            target,
            self.waits,
        )
    }
}
