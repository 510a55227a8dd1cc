//! Per-connection line framing.
//!
//! # Responsibilities
//! - Buffered read-until-delimiter on one connection
//! - Delimiter normalization for a trailing partial line
//! - Forward every line, in order, to the sink channel
//! - Stop promptly when shutdown fires
//!
//! # Design Decisions
//! - The read is raced against the shutdown token instead of closing the socket from
//!   a watcher task; dropping the read future is the cancellation
//! - `read_until` is cancel safe: bytes read before cancellation stay in the chunk,
//!   and whatever is left in the read buffer is framed the same way afterwards
//! - The send is NOT raced against shutdown: a framed line is never thrown away
//!   once the sink is still accepting

use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::config::PipelineConfig;
use crate::lifecycle::ShutdownListener;
use crate::net::ConnectionId;
use crate::observability::metrics;
use crate::pipeline::line::{Line, DEFAULT_DELIMITER};

/// Framing options shared by every reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub delimiter: u8,
    pub read_buffer_size: usize,
    pub forward_partial_on_shutdown: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            read_buffer_size: 8 * 1024,
            forward_partial_on_shutdown: true,
        }
    }
}

impl From<&PipelineConfig> for ReaderOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            delimiter: config.delimiter,
            read_buffer_size: config.read_buffer_size.max(1),
            forward_partial_on_shutdown: config.forward_partial_on_shutdown,
        }
    }
}

/// Why a connection reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Peer closed its side.
    Eof,
    /// Read failed (reset, broken pipe).
    ReadError,
    /// Shutdown fired while reading.
    Cancelled,
    /// The sink is gone; nothing more can be delivered.
    SinkClosed,
}

impl fmt::Display for ConnectionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionEnd::Eof => "eof",
            ConnectionEnd::ReadError => "read_error",
            ConnectionEnd::Cancelled => "cancelled",
            ConnectionEnd::SinkClosed => "sink_closed",
        };
        f.write_str(s)
    }
}

/// What one connection contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub lines: u64,
    pub bytes: u64,
    pub end: ConnectionEnd,
}

enum ReadEvent {
    Read(std::io::Result<usize>),
    Cancelled,
}

/// Frame lines from `conn` and send them to the sink until the stream ends.
///
/// The connection is dropped (closed) on return.
pub async fn handle<R>(
    conn: R,
    id: ConnectionId,
    lines: mpsc::Sender<Line>,
    shutdown: ShutdownListener,
    options: ReaderOptions,
) -> ConnectionSummary
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::with_capacity(options.read_buffer_size, conn);
    let mut chunk = Vec::new();
    let mut summary = ConnectionSummary {
        lines: 0,
        bytes: 0,
        end: ConnectionEnd::Eof,
    };

    let end = loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => ReadEvent::Cancelled,
            res = reader.read_until(options.delimiter, &mut chunk) => ReadEvent::Read(res),
        };

        match event {
            ReadEvent::Read(Ok(0)) => break ConnectionEnd::Eof,
            ReadEvent::Read(Ok(_)) => {
                if !forward(&lines, std::mem::take(&mut chunk), id, options, &mut summary).await {
                    break ConnectionEnd::SinkClosed;
                }
            }
            ReadEvent::Read(Err(e)) => {
                tracing::debug!(connection_id = %id, error = %e, "Connection read failed");
                break ConnectionEnd::ReadError;
            }
            ReadEvent::Cancelled => break ConnectionEnd::Cancelled,
        }
    };
    summary.end = end;

    // Bytes already pulled off the socket but not yet scanned are still ours.
    chunk.extend_from_slice(reader.buffer());
    let residue = std::mem::take(&mut chunk);

    for piece in residue.split_inclusive(|b| *b == options.delimiter) {
        let complete = piece.last() == Some(&options.delimiter);
        if !complete && end == ConnectionEnd::Cancelled && !options.forward_partial_on_shutdown {
            tracing::warn!(
                connection_id = %id,
                bytes = piece.len(),
                "Discarding partial line cut off by shutdown"
            );
            metrics::record_discarded_partial();
            break;
        }
        if !forward(&lines, piece.to_vec(), id, options, &mut summary).await {
            summary.end = ConnectionEnd::SinkClosed;
            break;
        }
    }

    summary
}

/// Frame and send one chunk. Returns false if the sink has gone away.
async fn forward(
    lines: &mpsc::Sender<Line>,
    chunk: Vec<u8>,
    id: ConnectionId,
    options: ReaderOptions,
    summary: &mut ConnectionSummary,
) -> bool {
    let Some(framed) = Line::frame(chunk, options.delimiter) else {
        return true;
    };

    if framed.normalized {
        tracing::trace!(connection_id = %id, "Appended delimiter to unterminated line");
        metrics::record_partial_line();
    }

    let len = framed.line.len() as u64;
    if lines.send(framed.line).await.is_err() {
        tracing::debug!(connection_id = %id, "Sink closed, dropping connection");
        return false;
    }

    summary.lines += 1;
    summary.bytes += len;
    true
}
