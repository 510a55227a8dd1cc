//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT) once at startup
//! - Translate them into a single termination event for the coordinator
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before serving so a failure is a startup error
//! - The rest of the daemon only ever sees the shutdown token

use std::fmt;
use std::io;

/// Which termination request arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationKind {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationKind::Interrupt => write!(f, "SIGINT"),
            TerminationKind::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Installed termination signal handlers.
#[cfg(unix)]
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next SIGINT or SIGTERM.
    pub async fn recv(&mut self) -> TerminationKind {
        tokio::select! {
            _ = self.interrupt.recv() => TerminationKind::Interrupt,
            _ = self.terminate.recv() => TerminationKind::Terminate,
        }
    }
}

/// Installed termination signal handlers.
#[cfg(not(unix))]
pub struct TerminationSignals {
    _private: (),
}

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self { _private: () })
    }

    /// Wait for Ctrl+C.
    pub async fn recv(&mut self) -> TerminationKind {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
        TerminationKind::Interrupt
    }
}
