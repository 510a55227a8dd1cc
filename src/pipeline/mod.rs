//! Log line pipeline.
//!
//! # Data Flow
//! ```text
//! LogListener
//!     → acceptor.rs (accept loop, one task per connection)
//!     → reader.rs (read-until-delimiter, normalization)
//!     → mpsc hand-off (capacity 1, backpressure)
//!     → sink.rs (write + flush per line)
//!     → output.rs (stdout or append-mode file)
//! ```
//!
//! # Design Decisions
//! - Per-connection order is kept because each reader sends sequentially
//! - No ordering across connections
//! - A slow output stalls readers instead of dropping lines

pub mod acceptor;
pub mod line;
pub mod output;
pub mod reader;
pub mod sink;

pub use acceptor::{serve, ServeSummary};
pub use line::Line;
pub use output::{LineOutput, Output};
pub use reader::ReaderOptions;
pub use sink::{LineSink, SinkStats};
