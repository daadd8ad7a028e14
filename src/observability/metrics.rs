//! Metrics collection and exposition.
//!
//! # Metrics
//! - `simulated_responses_total` (counter): responses by phase and status
//! - `simulated_request_duration_seconds` (histogram): time spent per request
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus endpoint is opt-in

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::simulation::Outcome;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one simulated response.
pub fn record_outcome(outcome: &Outcome, start: Instant) {
    let phase = outcome.phase.as_str();
    let status = outcome.status.as_u16().to_string();
    counter!("simulated_responses_total", "phase" => phase, "status" => status.clone()).increment(1);
    histogram!("simulated_request_duration_seconds", "phase" => phase, "status" => status)
        .record(start.elapsed().as_secs_f64());
}
