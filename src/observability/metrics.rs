//! Metrics collection and exposition.
//!
//! # Metrics
//! - `logmux_connections_total` (counter): accepted connections
//! - `logmux_active_connections` (gauge): live connection readers
//! - `logmux_lines_total` (counter): lines handed to the sink
//! - `logmux_bytes_total` (counter): bytes written to the output
//! - `logmux_partial_lines_total` (counter): lines that needed a delimiter appended
//! - `logmux_discarded_partials_total` (counter): residue dropped at shutdown
//! - `logmux_sink_errors_total` (counter): output write/flush failures
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - The Prometheus exporter is optional and serves its own HTTP listener

use std::net::SocketAddr;

use ::metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened(active: u64) {
    counter!("logmux_connections_total").increment(1);
    gauge!("logmux_active_connections").set(active as f64);
}

pub fn record_connection_closed(active: u64) {
    gauge!("logmux_active_connections").set(active as f64);
}

/// A line written to the output.
pub fn record_line_written(bytes: usize) {
    counter!("logmux_lines_total").increment(1);
    counter!("logmux_bytes_total").increment(bytes as u64);
}

pub fn record_partial_line() {
    counter!("logmux_partial_lines_total").increment(1);
}

pub fn record_discarded_partial() {
    counter!("logmux_discarded_partials_total").increment(1);
}

pub fn record_sink_error(stage: &'static str) {
    counter!("logmux_sink_errors_total", "stage" => stage).increment(1);
}
