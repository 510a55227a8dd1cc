//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP / Unix connection
//!     → listener.rs (bind by address shape, accept)
//!     → connection.rs (id, live-connection tracking)
//!     → Hand off to pipeline::reader
//! ```
//!
//! # Design Decisions
//! - One stream type for both socket families so the reader stays generic-free
//! - Unix socket files are owned by the listener and removed with it

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Accept, ListenAddr, LogListener, LogStream};
