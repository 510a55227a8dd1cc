//! logmux: aggregate newline-delimited logs from many sockets into one stream.
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──┐
//!   client ──┼─▶ net::listener ─▶ pipeline::acceptor ─▶ pipeline::reader (one per conn)
//!   client ──┘                                               │
//!                                                            ▼
//!                                              mpsc hand-off (capacity 1)
//!                                                            │
//!                                                            ▼
//!                                 pipeline::sink ─▶ pipeline::output (stdout | file)
//!
//!   lifecycle::coordinator: signal / fatal error → shutdown token → drain → stop
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;

pub use config::DaemonConfig;
pub use error::DaemonError;
pub use lifecycle::Shutdown;
