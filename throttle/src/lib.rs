//! Rate-limited byte stream copying
//!
//! This crate moves bytes from a readable source to a writable sink while keeping the observed
//! throughput at or below a target rate expressed in bytes per second.
//!
//! # Overview
//!
//! The throttle is a **global average**: the rate is measured as the number of bytes sent so far
//! divided by the time elapsed since the copy started. Before each byte is emitted the copier
//! checks that average against the target and waits while it is above. A target rate of `0`
//! disables throttling and the copy becomes a plain bulk copy.
//!
//! Because the average is taken from the start of the copy, and not over a trailing window, a
//! source that stalls for a while "earns" credit: the bytes following the stall go out without
//! waiting until the average catches up with the target again.
//!
//! # Usage
//!
//! ## Blocking copy
//!
//! ```rust,no_run
//! # fn example() -> Result<(), throttle::Error> {
//! // copy stdin to stdout at 1 KiB/s
//! let summary = throttle::copy(&mut std::io::stdin(), &mut std::io::stdout(), 1024)?;
//! eprintln!("{}", summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Async copy
//!
//! ```rust,no_run
//! use throttle::{ThrottledCopier, WaitStrategy};
//!
//! # async fn example() -> Result<(), throttle::Error> {
//! let mut source = tokio::io::stdin();
//! let mut sink = tokio::io::stdout();
//! ThrottledCopier::new(100)
//!     .wait_strategy(WaitStrategy::Sleep)
//!     .run_async(&mut source, &mut sink)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Wait Strategies
//!
//! - [`WaitStrategy::Spin`] (default): flush the sink and yield to the scheduler in a tight loop
//!   until the average drops to the target. No timer is involved, so rate tracking has minimal
//!   jitter, at the cost of keeping a CPU busy while throttling.
//! - [`WaitStrategy::Sleep`]: flush the sink and sleep until the earliest instant at which the
//!   next byte is allowed. Nearly no CPU is used; accuracy is bound by timer granularity.
//!
//! Both strategies re-check the same condition after waking up, so neither lets the average
//! rate exceed the target.
//!
//! # Time Measurement
//!
//! All durations come from a monotonic [`Clock`]: [`MonotonicClock`] for blocking copies and
//! [`TokioClock`] for async copies. Wall-clock time is never consulted, so system clock
//! adjustments cannot corrupt the rate estimate.
//!
//! # Errors
//!
//! A read or write failure aborts the copy immediately with [`Error::Read`] or [`Error::Write`].
//! Bytes written before the failure stay written; no retries are attempted.

mod clock;
mod copier;
mod error;
pub mod rate;
mod session;
mod summary;

pub use clock::{Clock, MonotonicClock, TokioClock};
pub use copier::{ThrottledCopier, WaitStrategy, copy, copy_async};
pub use error::{Error, Result};
pub use session::TransferSession;
pub use summary::Summary;
