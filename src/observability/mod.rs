//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured diagnostic events on stderr)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Operator terminal / journal (stderr)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Diagnostics never touch stdout, which can be the aggregation target
//! - Connection IDs flow through every per-connection log line
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
