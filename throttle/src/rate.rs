/// Average throughput in bytes per second since the start of a session.
///
/// Zero elapsed time does not fault: with nothing sent yet the estimate is `0.0`, so the first
/// byte of a session is always below any target. Bytes reported as sent at zero elapsed time
/// yield `f64::INFINITY`, which keeps the caller waiting until the clock moves.
pub fn estimate(elapsed: std::time::Duration, bytes_sent: u64) -> f64 {
    if bytes_sent == 0 {
        return 0.0;
    }
    if elapsed.is_zero() {
        return f64::INFINITY;
    }
    bytes_sent as f64 / elapsed.as_secs_f64()
}

/// Returns true when the average rate is above `target_rate`.
///
/// A `target_rate` of 0 means unthrottled and is never exceeded.
pub fn exceeds(elapsed: std::time::Duration, bytes_sent: u64, target_rate: u64) -> bool {
    target_rate > 0 && estimate(elapsed, bytes_sent) > target_rate as f64
}

/// Earliest time since session start at which `bytes_sent` bytes are back within `target_rate`.
pub fn earliest_allowed(bytes_sent: u64, target_rate: u64) -> std::time::Duration {
    if target_rate == 0 {
        return std::time::Duration::ZERO;
    }
    // rounded up so that the estimate at the returned time is never above target
    let nanos = (u128::from(bytes_sent) * 1_000_000_000).div_ceil(u128::from(target_rate));
    let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
    // remainder of a division by 10^9 always fits in u32
    let subsec = (nanos % 1_000_000_000) as u32;
    std::time::Duration::new(secs, subsec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_byte_is_never_over_target() {
        assert_eq!(estimate(Duration::ZERO, 0), 0.0);
        assert!(!exceeds(Duration::ZERO, 0, 1));
    }

    #[test]
    fn zero_elapsed_with_bytes_sent_is_over_target() {
        assert!(estimate(Duration::ZERO, 1).is_infinite());
        assert!(exceeds(Duration::ZERO, 1, u64::MAX));
    }

    #[test]
    fn average_since_start() {
        assert_eq!(estimate(Duration::from_secs(2), 10), 5.0);
        assert_eq!(estimate(Duration::from_millis(500), 1), 2.0);
    }

    #[test]
    fn at_target_is_not_exceeded() {
        assert!(!exceeds(Duration::from_secs(2), 10, 5));
        assert!(exceeds(Duration::from_millis(1999), 10, 5));
    }

    #[test]
    fn unthrottled_is_never_exceeded() {
        assert!(!exceeds(Duration::ZERO, 1_000_000, 0));
    }

    #[test]
    fn earliest_allowed_matches_target() {
        assert_eq!(earliest_allowed(9, 5), Duration::from_millis(1800));
        assert_eq!(earliest_allowed(0, 5), Duration::ZERO);
        assert_eq!(earliest_allowed(100, 0), Duration::ZERO);
        assert!(!exceeds(earliest_allowed(7, 3), 7, 3));
    }
}
