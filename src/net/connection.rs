//! Connection identity and live-connection accounting.
//!
//! # Responsibilities
//! - Hand every accepted client a process-unique `conn-N` id
//! - Count accepted and live connections for drain logs and metrics
//! - Log a connection's peer and lifetime when its reader goes away, aborted or not

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier, shown as `conn-N` in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        // Only uniqueness matters here.
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counts {
    accepted: AtomicU64,
    live: AtomicU64,
}

/// Shared connection counters for one accept loop.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    counts: Arc<Counts>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accepted connection from `peer`.
    ///
    /// The returned guard must live as long as the connection's reader.
    pub fn track(&self, peer: String) -> ConnectionGuard {
        self.counts.accepted.fetch_add(1, Ordering::Relaxed);
        let live = self.counts.live.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_connection_opened(live);

        let guard = ConnectionGuard {
            counts: Arc::clone(&self.counts),
            id: ConnectionId::new(),
            peer,
            opened_at: Instant::now(),
        };
        tracing::debug!(connection_id = %guard.id, peer = %guard.peer, live, "Connection accepted");
        guard
    }

    /// Connections whose reader has not finished yet.
    pub fn active_count(&self) -> u64 {
        self.counts.live.load(Ordering::SeqCst)
    }

    /// Connections accepted over the tracker's lifetime.
    pub fn accepted(&self) -> u64 {
        self.counts.accepted.load(Ordering::Relaxed)
    }
}

/// One live connection. Dropping it closes the books on that connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    counts: Arc<Counts>,
    id: ConnectionId,
    peer: String,
    opened_at: Instant,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let live = self.counts.live.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_connection_closed(live);
        tracing::trace!(
            connection_id = %self.id,
            peer = %self.peer,
            open_ms = self.opened_at.elapsed().as_millis() as u64,
            live,
            "Connection released"
        );
    }
}
