//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the output resource
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is served
//! - Output opens before the listener so clients are never accepted into a void

use crate::config::DaemonConfig;
use crate::error::StartupError;
use crate::net::LogListener;
use crate::pipeline::Output;

/// Everything the coordinator needs to start serving.
pub struct Resources {
    pub listener: LogListener,
    pub output: Output,
}

/// Acquire the output and the listening socket.
pub async fn start(config: &DaemonConfig) -> Result<Resources, StartupError> {
    let output = Output::open(&config.output).await?;
    let listener = LogListener::bind(&config.listener).await?;
    Ok(Resources { listener, output })
}
