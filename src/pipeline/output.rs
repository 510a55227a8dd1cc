//! The aggregated output resource.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::OutputConfig;
use crate::error::StartupError;

/// Something the line sink can own and write to.
///
/// `sync` is called once after the last line, for outputs that can make data durable
/// beyond a flush.
pub trait LineOutput: AsyncWrite + Unpin + Send + 'static {
    fn sync(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

impl LineOutput for Vec<u8> {
    async fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Standard output or an append-mode file.
#[derive(Debug)]
pub enum Output {
    Stdout(tokio::io::Stdout),
    File { file: tokio::fs::File, path: PathBuf },
}

impl Output {
    /// Open the configured target, creating the file if it does not exist.
    pub async fn open(config: &OutputConfig) -> Result<Self, StartupError> {
        if config.is_stdout() {
            tracing::info!("Writing aggregated lines to stdout");
            return Ok(Output::Stdout(tokio::io::stdout()));
        }

        let path = PathBuf::from(&config.path);
        let mut options = tokio::fs::OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o644);

        let file = options
            .open(&path)
            .await
            .map_err(|source| StartupError::OpenOutput {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Writing aggregated lines to file");
        Ok(Output::File { file, path })
    }
}

impl LineOutput for Output {
    async fn sync(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(stdout) => stdout.flush().await,
            Output::File { file, .. } => {
                file.flush().await?;
                file.sync_all().await
            }
        }
    }
}

impl AsyncWrite for Output {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Output::Stdout(stdout) => Pin::new(stdout).poll_write(cx, buf),
            Output::File { file, .. } => Pin::new(file).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Output::Stdout(stdout) => Pin::new(stdout).poll_flush(cx),
            Output::File { file, .. } => Pin::new(file).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Output::Stdout(stdout) => Pin::new(stdout).poll_shutdown(cx),
            Output::File { file, .. } => Pin::new(file).poll_shutdown(cx),
        }
    }
}
