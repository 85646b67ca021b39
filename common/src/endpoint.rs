//! Opening the source and sink of a transfer
//!
//! Both ends are opened in binary mode. A missing path falls back to the process standard input
//! or output. Paths may name regular files or named pipes; opening a named pipe blocks until the
//! other end is opened as well.

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

pub type Source = Box<dyn tokio::io::AsyncRead + Unpin + Send>;
pub type Sink = Box<dyn tokio::io::AsyncWrite + Unpin + Send>;

pub async fn open_source(path: Option<&std::path::Path>) -> Result<Source> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed opening input {:?}", path))?;
            tracing::debug!("reading from {:?}", path);
            Ok(Box::new(file))
        }
        None => {
            tracing::debug!("reading from standard input");
            Ok(Box::new(tokio::io::stdin()))
        }
    }
}

pub async fn open_sink(path: Option<&std::path::Path>) -> Result<Sink> {
    match path {
        Some(path) => {
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .await
                .with_context(|| format!("failed opening output {:?}", path))?;
            tracing::debug!("writing to {:?}", path);
            Ok(Box::new(tokio::io::BufWriter::new(file)))
        }
        None => {
            tracing::debug!("writing to standard output");
            Ok(Box::new(tokio::io::BufWriter::new(tokio::io::stdout())))
        }
    }
}

/// Opens both ends described by `config` and copies the source into the sink.
pub async fn transfer(config: &crate::TransferConfig) -> Result<throttle::Summary> {
    let mut source = open_source(config.input.as_deref()).await?;
    let mut sink = open_sink(config.output.as_deref()).await?;
    let copier = throttle::ThrottledCopier::new(config.rate).wait_strategy(config.wait_strategy);
    tracing::debug!("copying at {} B/s", copier.target_rate());
    let summary = match copier.run_async(&mut source, &mut sink).await {
        Ok(summary) => summary,
        Err(error) => {
            tracing::debug!("copy aborted after {} bytes", error.bytes_sent());
            // close the output so bytes written before the fault are kept
            if let Err(shutdown_error) = sink.shutdown().await {
                tracing::debug!("failed closing output after error: {}", shutdown_error);
            }
            return Err(anyhow::Error::from(error).context("throttled copy failed"));
        }
    };
    sink.shutdown()
        .await
        .context("failed closing output")?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transfer_between_files() -> Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        tokio::fs::write(&input, b"hello").await?;
        let config = crate::TransferConfig {
            input: Some(input),
            output: Some(output.clone()),
            rate: 0,
            ..Default::default()
        };
        let summary = transfer(&config).await?;
        assert_eq!(summary.bytes_copied, 5);
        assert_eq!(tokio::fs::read(&output).await?, b"hello");
        Ok(())
    }

    #[tokio::test]
    async fn output_is_truncated() -> Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        tokio::fs::write(&input, b"new").await?;
        tokio::fs::write(&output, b"old contents").await?;
        let config = crate::TransferConfig {
            input: Some(input),
            output: Some(output.clone()),
            rate: 1000,
            wait_strategy: throttle::WaitStrategy::Sleep,
        };
        transfer(&config).await?;
        assert_eq!(tokio::fs::read(&output).await?, b"new");
        Ok(())
    }

    #[tokio::test]
    async fn missing_input_is_reported() -> Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let input = tmp_dir.path().join("does-not-exist");
        let config = crate::TransferConfig {
            input: Some(input),
            output: Some(tmp_dir.path().join("output")),
            rate: 1,
            ..Default::default()
        };
        let error = transfer(&config).await.unwrap_err();
        assert!(
            format!("{:#}", error).contains("failed opening input"),
            "{:#}",
            error
        );
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn unreadable_input_is_a_copy_failure() -> Result<()> {
        // a directory opens fine but every read fails
        let tmp_dir = tempfile::tempdir()?;
        let output = tmp_dir.path().join("output");
        let config = crate::TransferConfig {
            input: Some(tmp_dir.path().to_path_buf()),
            output: Some(output.clone()),
            rate: 0,
            ..Default::default()
        };
        let error = transfer(&config).await.unwrap_err();
        let copy_error = error
            .downcast_ref::<throttle::Error>()
            .expect("copy error in the chain");
        assert!(matches!(copy_error, throttle::Error::Read { bytes_sent: 0, .. }));
        assert!(format!("{:#}", error).contains("throttled copy failed"), "{:#}", error);
        assert!(tokio::fs::read(&output).await?.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn transfer_from_named_pipe() -> Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let fifo = tmp_dir.path().join("fifo");
        let status = std::process::Command::new("mkfifo").arg(&fifo).status()?;
        assert!(status.success());
        let writer = {
            let fifo = fifo.clone();
            tokio::task::spawn_blocking(move || std::fs::write(fifo, b"through a pipe"))
        };
        let output = tmp_dir.path().join("output");
        let config = crate::TransferConfig {
            input: Some(fifo),
            output: Some(output.clone()),
            rate: 0,
            ..Default::default()
        };
        transfer(&config).await?;
        writer.await??;
        assert_eq!(tokio::fs::read(&output).await?, b"through a pipe");
        Ok(())
    }
}
