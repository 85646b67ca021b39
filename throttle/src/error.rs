/// I/O fault that aborted a copy.
///
/// Bytes written before the fault stay written; nothing after the failing byte is attempted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed reading from source after {bytes_sent} bytes")]
    Read {
        bytes_sent: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing to sink after {bytes_sent} bytes")]
    Write {
        bytes_sent: u64,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Number of bytes successfully written to the sink before the fault.
    pub fn bytes_sent(&self) -> u64 {
        match self {
            Error::Read { bytes_sent, .. } | Error::Write { bytes_sent, .. } => *bytes_sent,
        }
    }

    pub fn io_error(&self) -> &std::io::Error {
        match self {
            Error::Read { source, .. } | Error::Write { source, .. } => source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
