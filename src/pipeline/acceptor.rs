//! Accept loop.
//!
//! # Responsibilities
//! - Accept connections until shutdown or a fatal accept error
//! - Spawn one reader task per connection into a join set
//! - Close the listener, then wait for every reader before returning
//!
//! # Design Decisions
//! - A pending accept is interrupted by racing it against the shutdown token;
//!   stopping that way is a normal exit, not an error
//! - A fatal accept error fires the shared shutdown token so live readers stop too,
//!   then the error is returned to the coordinator
//! - Finished readers are reaped inside the loop so the join set stays small

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::error::AcceptError;
use crate::lifecycle::Shutdown;
use crate::net::{Accept, ConnectionTracker};
use crate::pipeline::line::Line;
use crate::pipeline::reader::{self, ConnectionSummary, ReaderOptions};

/// Totals for one run of the accept loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    pub connections: u64,
    pub lines: u64,
}

impl ServeSummary {
    fn record(&mut self, joined: Result<ConnectionSummary, JoinError>) {
        match joined {
            Ok(summary) => self.lines += summary.lines,
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!(error = %e, "Connection reader panicked"),
        }
    }
}

/// Serve `listener` until shutdown fires or accept fails.
///
/// Returns only after all connection readers have finished.
pub async fn serve<L: Accept>(
    listener: L,
    lines: mpsc::Sender<Line>,
    shutdown: Shutdown,
    options: ReaderOptions,
) -> Result<ServeSummary, AcceptError> {
    let cancel = shutdown.subscribe();
    let tracker = ConnectionTracker::new();
    let mut readers = JoinSet::new();
    let mut summary = ServeSummary::default();

    tracing::info!(address = %listener.local_addr(), "Accepting connections");

    let result = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(()),
            Some(joined) = readers.join_next(), if !readers.is_empty() => summary.record(joined),
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let guard = tracker.track(peer);
                    let id = guard.id();

                    let lines = lines.clone();
                    let cancel = cancel.clone();
                    readers.spawn(async move {
                        let result = reader::handle(stream, id, lines, cancel, options).await;
                        tracing::debug!(
                            connection_id = %id,
                            peer = %guard.peer(),
                            lines = result.lines,
                            bytes = result.bytes,
                            end = %result.end,
                            "Connection finished"
                        );
                        drop(guard);
                        result
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed, stopping listener");
                    shutdown.trigger();
                    break Err(AcceptError(e));
                }
            },
        }
    };

    drop(listener);
    drop(lines);

    if !readers.is_empty() {
        tracing::info!(active = tracker.active_count(), "Waiting for connections to drain");
    }
    while let Some(joined) = readers.join_next().await {
        summary.record(joined);
    }
    summary.connections = tracker.accepted();

    tracing::info!(
        connections = summary.connections,
        lines = summary.lines,
        "Accept loop stopped"
    );
    result.map(|()| summary)
}
