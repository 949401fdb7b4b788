//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, dispatch outcomes, retries)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-backend health and circuit transitions
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_dispatch_outcomes_total` (counter): dispatch outcomes by service
//! - `gateway_retries_total` (counter): retry attempts by service
//! - `gateway_backend_health` (gauge): 1=serving, 0=not serving
//! - `gateway_circuit_transitions_total` (counter): health transitions by target state
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels are bounded: service names come from configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::state::HealthState;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed inbound request.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.clone(),
        "service" => service.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status,
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one dispatch.
pub fn record_dispatch(service: &str, outcome: &'static str) {
    metrics::counter!(
        "gateway_dispatch_outcomes_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_retry(service: &str) {
    metrics::counter!("gateway_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_backend_health(service: &str, serving: bool) {
    metrics::gauge!("gateway_backend_health", "service" => service.to_string())
        .set(if serving { 1.0 } else { 0.0 });
}

pub fn record_circuit_transition(service: &str, to: HealthState) {
    metrics::counter!(
        "gateway_circuit_transitions_total",
        "service" => service.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
}
