use std::io::{BufRead, Read, Write};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::instrument;

use crate::clock::{Clock, MonotonicClock, TokioClock};
use crate::error::{Error, Result};
use crate::session::TransferSession;
use crate::summary::Summary;

const READ_BUFFER_SIZE: usize = 128 * 1024;

/// How the copier waits while the average rate is above target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WaitStrategy {
    /// Busy-wait: flush the sink and yield to the scheduler until the rate drops. Lowest jitter,
    /// burns a CPU core while throttling.
    #[default]
    Spin,
    /// Flush the sink and sleep until the earliest instant the next byte is allowed.
    Sleep,
}

/// Copies a byte stream from a source to a sink, keeping the average rate since the start of
/// the copy at or below a target.
#[derive(Copy, Clone, Debug)]
pub struct ThrottledCopier {
    target_rate: u64,
    wait_strategy: WaitStrategy,
}

impl ThrottledCopier {
    /// `target_rate` is in bytes per second; 0 disables throttling.
    pub fn new(target_rate: u64) -> Self {
        Self {
            target_rate,
            wait_strategy: WaitStrategy::default(),
        }
    }

    pub fn wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    pub fn target_rate(&self) -> u64 {
        self.target_rate
    }

    /// Copies until the source is exhausted, blocking the current thread.
    pub fn run<R, W>(&self, source: &mut R, sink: &mut W) -> Result<Summary>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        self.run_with_clock(source, sink, MonotonicClock::new())
    }

    #[instrument(skip_all, fields(target_rate = self.target_rate, wait = ?self.wait_strategy))]
    pub fn run_with_clock<R, W, C>(&self, source: &mut R, sink: &mut W, clock: C) -> Result<Summary>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
        C: Clock,
    {
        let mut session = TransferSession::start(clock, self.target_rate);
        tracing::debug!("copy started");
        let copied = if self.target_rate == 0 {
            copy_unthrottled(source, sink, &mut session)
        } else {
            self.copy_throttled(source, sink, &mut session)
        };
        if let Err(error) = copied {
            // bytes accepted by the sink before the fault must still reach it
            if let Err(flush_error) = sink.flush() {
                tracing::debug!("flush after failed copy also failed: {}", flush_error);
            }
            return Err(error);
        }
        sink.flush().map_err(|source| Error::Write {
            bytes_sent: session.bytes_sent(),
            source,
        })?;
        let summary = session.summary();
        tracing::debug!("copy finished: {:?}", &summary);
        Ok(summary)
    }

    fn copy_throttled<R, W, C>(
        &self,
        source: &mut R,
        sink: &mut W,
        session: &mut TransferSession<C>,
    ) -> Result<()>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
        C: Clock,
    {
        let mut reader = std::io::BufReader::with_capacity(READ_BUFFER_SIZE, source);
        loop {
            let chunk = match reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(Error::Read {
                        bytes_sent: session.bytes_sent(),
                        source,
                    });
                }
            };
            if chunk.is_empty() {
                return Ok(());
            }
            let len = chunk.len();
            for &byte in chunk {
                self.wait_for_capacity(sink, session)?;
                sink.write_all(&[byte]).map_err(|source| Error::Write {
                    bytes_sent: session.bytes_sent(),
                    source,
                })?;
                session.record_bytes(1);
            }
            reader.consume(len);
        }
    }

    fn wait_for_capacity<W, C>(&self, sink: &mut W, session: &mut TransferSession<C>) -> Result<()>
    where
        W: Write + ?Sized,
        C: Clock,
    {
        let mut waiting = false;
        while session.rate_exceeded() {
            if !waiting {
                waiting = true;
                session.record_wait();
                tracing::trace!(
                    "rate {:.3} B/s above target after {} bytes, waiting",
                    session.current_rate(),
                    session.bytes_sent()
                );
            }
            sink.flush().map_err(|source| Error::Write {
                bytes_sent: session.bytes_sent(),
                source,
            })?;
            match self.wait_strategy {
                WaitStrategy::Spin => std::thread::yield_now(),
                WaitStrategy::Sleep => {
                    let remaining = session.time_until_allowed();
                    if remaining.is_zero() {
                        std::thread::yield_now();
                    } else {
                        std::thread::sleep(remaining);
                    }
                }
            }
        }
        Ok(())
    }

    /// Copies until the source is exhausted, yielding to the tokio scheduler while throttling.
    ///
    /// Time is measured with [`TokioClock`], so paused test time applies.
    pub async fn run_async<R, W>(&self, source: &mut R, sink: &mut W) -> Result<Summary>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.run_async_with_clock(source, sink, TokioClock::new())
            .await
    }

    #[instrument(skip_all, fields(target_rate = self.target_rate, wait = ?self.wait_strategy))]
    pub async fn run_async_with_clock<R, W, C>(
        &self,
        source: &mut R,
        sink: &mut W,
        clock: C,
    ) -> Result<Summary>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
        C: Clock,
    {
        let mut session = TransferSession::start(clock, self.target_rate);
        tracing::debug!("copy started");
        let copied = if self.target_rate == 0 {
            copy_unthrottled_async(source, sink, &mut session).await
        } else {
            self.copy_throttled_async(source, sink, &mut session).await
        };
        if let Err(error) = copied {
            // bytes accepted by the sink before the fault must still reach it
            if let Err(flush_error) = sink.flush().await {
                tracing::debug!("flush after failed copy also failed: {}", flush_error);
            }
            return Err(error);
        }
        sink.flush().await.map_err(|source| Error::Write {
            bytes_sent: session.bytes_sent(),
            source,
        })?;
        let summary = session.summary();
        tracing::debug!("copy finished: {:?}", &summary);
        Ok(summary)
    }

    async fn copy_throttled_async<R, W, C>(
        &self,
        source: &mut R,
        sink: &mut W,
        session: &mut TransferSession<C>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
        C: Clock,
    {
        let mut reader = tokio::io::BufReader::with_capacity(READ_BUFFER_SIZE, source);
        loop {
            let chunk = match reader.fill_buf().await {
                Ok(chunk) => chunk,
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(Error::Read {
                        bytes_sent: session.bytes_sent(),
                        source,
                    });
                }
            };
            if chunk.is_empty() {
                return Ok(());
            }
            let len = chunk.len();
            for &byte in chunk {
                self.wait_for_capacity_async(sink, session).await?;
                sink.write_all(&[byte]).await.map_err(|source| Error::Write {
                    bytes_sent: session.bytes_sent(),
                    source,
                })?;
                session.record_bytes(1);
            }
            reader.consume(len);
        }
    }

    async fn wait_for_capacity_async<W, C>(
        &self,
        sink: &mut W,
        session: &mut TransferSession<C>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
        C: Clock,
    {
        let mut waiting = false;
        while session.rate_exceeded() {
            if !waiting {
                waiting = true;
                session.record_wait();
                tracing::trace!(
                    "rate {:.3} B/s above target after {} bytes, waiting",
                    session.current_rate(),
                    session.bytes_sent()
                );
            }
            sink.flush().await.map_err(|source| Error::Write {
                bytes_sent: session.bytes_sent(),
                source,
            })?;
            match self.wait_strategy {
                WaitStrategy::Spin => tokio::task::yield_now().await,
                WaitStrategy::Sleep => {
                    let remaining = session.time_until_allowed();
                    if remaining.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(remaining).await;
                    }
                }
            }
        }
        Ok(())
    }
}

fn copy_unthrottled<R, W, C>(
    source: &mut R,
    sink: &mut W,
    session: &mut TransferSession<C>,
) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    C: Clock,
{
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let count = match source.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(count) => count,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(Error::Read {
                    bytes_sent: session.bytes_sent(),
                    source,
                });
            }
        };
        sink.write_all(&buffer[..count])
            .map_err(|source| Error::Write {
                bytes_sent: session.bytes_sent(),
                source,
            })?;
        session.record_bytes(count as u64);
    }
}

async fn copy_unthrottled_async<R, W, C>(
    source: &mut R,
    sink: &mut W,
    session: &mut TransferSession<C>,
) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    C: Clock,
{
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let count = match source.read(&mut buffer).await {
            Ok(0) => return Ok(()),
            Ok(count) => count,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(Error::Read {
                    bytes_sent: session.bytes_sent(),
                    source,
                });
            }
        };
        sink.write_all(&buffer[..count])
            .await
            .map_err(|source| Error::Write {
                bytes_sent: session.bytes_sent(),
                source,
            })?;
        session.record_bytes(count as u64);
    }
}

/// Copies `source` to `sink` at no more than `target_rate` bytes per second (0 = unthrottled),
/// busy-waiting while the rate is above target.
pub fn copy<R, W>(source: &mut R, sink: &mut W, target_rate: u64) -> Result<Summary>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    ThrottledCopier::new(target_rate).run(source, sink)
}

/// Async version of [`copy`].
pub async fn copy_async<R, W>(source: &mut R, sink: &mut W, target_rate: u64) -> Result<Summary>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    ThrottledCopier::new(target_rate).run_async(source, sink).await
}
