//! Error types shared across the daemon.
//!
//! # Taxonomy
//! - [`StartupError`]: fatal before serving begins (output, bind, signal handlers)
//! - [`AcceptError`]: fatal accept-loop failure not caused by shutdown
//! - [`SinkError`]: output write, flush or final sync failure
//!
//! Per-connection failures never surface here; they end their own reader only.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while bringing the daemon up. No serving happens after one of these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open output {path:?}: {source}")]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

/// The accept loop stopped for a reason other than cancellation.
#[derive(Debug, Error)]
#[error("failed to accept connection: {0}")]
pub struct AcceptError(#[from] pub std::io::Error);

/// The line sink could not write to the output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write to output failed after {lines_written} lines: {source}")]
    Write {
        lines_written: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("flush of output failed after {lines_written} lines: {source}")]
    Flush {
        lines_written: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("final sync of output failed after {lines_written} lines: {source}")]
    Sync {
        lines_written: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Any error that makes the daemon exit with a failure status.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Accept(#[from] AcceptError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("{task} task failed: {source}")]
    Task {
        task: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}
