//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Output value that selects the process's standard output.
pub const STDOUT_TARGET: &str = "-";

/// Root configuration for the log daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DaemonConfig {
    /// Listener configuration (address, socket permissions).
    pub listener: ListenerConfig,

    /// Where aggregated lines are written.
    pub output: OutputConfig,

    /// Framing and hand-off settings.
    pub pipeline: PipelineConfig,

    /// Grace period and drain timeout.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// `host:port` for TCP, anything without a colon is a Unix socket path.
    pub address: String,

    /// Permission bits applied to a freshly bound Unix socket (e.g. `0o660`).
    pub unix_socket_mode: Option<u32>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "/var/log/log.sock".to_string(),
            unix_socket_mode: None,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File path opened in append mode, or `-` for stdout.
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: STDOUT_TARGET.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn is_stdout(&self) -> bool {
        self.path == STDOUT_TARGET
    }
}

/// Line framing and channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Byte terminating each log line.
    pub delimiter: u8,

    /// Capacity of the reader → sink hand-off channel.
    pub channel_capacity: usize,

    /// Per-connection read buffer size in bytes.
    pub read_buffer_size: usize,

    /// Forward a partial line cut off by shutdown (delimiter appended) instead of discarding it.
    pub forward_partial_on_shutdown: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delimiter: b'\n',
            channel_capacity: 1,
            read_buffer_size: 8 * 1024,
            forward_partial_on_shutdown: true,
        }
    }
}

/// Shutdown timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Wait after a termination signal before cancelling, in milliseconds.
    pub grace_period_ms: u64,

    /// Upper bound on waiting for connections to drain, in milliseconds.
    pub drain_timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 3000,
            drain_timeout_ms: 3000,
        }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Diagnostic log rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Diagnostic log format.
    pub log_format: LogFormat,

    /// Prometheus scrape endpoint; metrics exporter is off when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: None,
        }
    }
}

/// Parse a delimiter given on the command line.
///
/// Accepts a single character (`;`), a common escape (`\n`, `\r`, `\t`, `\0`) or a
/// hex byte (`0x1e`).
pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "\\n" => return Ok(b'\n'),
        "\\r" => return Ok(b'\r'),
        "\\t" => return Ok(b'\t'),
        "\\0" => return Ok(0),
        _ => {}
    }

    if let Some(hex) = raw.strip_prefix("0x") {
        return u8::from_str_radix(hex, 16).map_err(|e| format!("invalid hex delimiter {raw:?}: {e}"));
    }

    match raw.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!("delimiter must be a single byte, got {raw:?}")),
    }
}
