//! Metrics collection and exposition.
//!
//! # Metrics
//! - `express_requests_total` (counter): requests by method, status, outcome
//! - `express_request_duration_seconds` (histogram): dispatch latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder the calls are no-ops, so tests need no setup
//! - Outcome label is one of `handled`, `not_found`, `error`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, started: Instant) {
    metrics::counter!(
        "express_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("express_request_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}
