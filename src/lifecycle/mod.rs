//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Open output → Bind listener
//!
//! Coordinator (coordinator.rs):
//!     Serve → (signal | accept error | sink error)
//!     → grace period (signal only) → trigger shutdown
//!     → bounded drain of connections → close channel → sink drains → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → termination event
//! ```
//!
//! # Design Decisions
//! - Ordered startup: output first, then listener
//! - Ordered shutdown: stop accept, drain readers, close channel, drain sink
//! - Drain has timeout: readers are aborted after the deadline

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use coordinator::{run, run_until, CoordinatorOptions, DaemonState, RunReport};
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::TerminationKind;
