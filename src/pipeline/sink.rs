//! The single writer.
//!
//! # Responsibilities
//! - Own the output for the whole process lifetime
//! - Write then flush each line before receiving the next
//! - Sync the output once the channel is closed and drained
//!
//! # Design Decisions
//! - One owner means no locking around the output
//! - A write or flush failure ends the sink and is returned, not swallowed;
//!   dropping the receiver makes every pending reader send fail fast

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::error::SinkError;
use crate::observability::metrics;
use crate::pipeline::line::Line;
use crate::pipeline::output::LineOutput;

/// Totals written by a sink.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    pub lines: u64,
    pub bytes: u64,
}

/// Fan-in consumer that serializes lines into one output.
pub struct LineSink<W> {
    out: W,
    stats: SinkStats,
}

impl<W: LineOutput> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            stats: SinkStats::default(),
        }
    }

    /// Drain `lines` until every sender is dropped, then hand the output back.
    pub async fn run(mut self, mut lines: mpsc::Receiver<Line>) -> Result<(W, SinkStats), SinkError> {
        while let Some(line) = lines.recv().await {
            self.write_line(&line).await?;
        }

        self.out.sync().await.map_err(|source| {
            metrics::record_sink_error("sync");
            SinkError::Sync {
                lines_written: self.stats.lines,
                source,
            }
        })?;

        tracing::info!(
            lines = self.stats.lines,
            bytes = self.stats.bytes,
            "Line sink drained"
        );
        Ok((self.out, self.stats))
    }

    async fn write_line(&mut self, line: &Line) -> Result<(), SinkError> {
        let lines_written = self.stats.lines;

        if let Err(source) = self.out.write_all(line.as_bytes()).await {
            metrics::record_sink_error("write");
            tracing::error!(error = %source, lines_written, "Output write failed");
            return Err(SinkError::Write { lines_written, source });
        }
        if let Err(source) = self.out.flush().await {
            metrics::record_sink_error("flush");
            tracing::error!(error = %source, lines_written, "Output flush failed");
            return Err(SinkError::Flush { lines_written, source });
        }

        self.stats.lines += 1;
        self.stats.bytes += line.len() as u64;
        metrics::record_line_written(line.len());
        Ok(())
    }
}
