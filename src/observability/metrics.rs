//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): completed operations by tag, outcome
//! - `gateway_request_duration_ms` (histogram): latency distribution
//! - `gateway_errors_total` (counter): failures by classifier category
//! - `gateway_rate_limited_total` (counter): quota violations
//! - `gateway_breaker_transitions_total` (counter): trips and recoveries
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_session_events_total` (counter): session lifecycle events

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start the Prometheus exporter on its own address.
///
/// Must be called from within the Tokio runtime; the exporter serves
/// scrapes on a background task.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed operation with its outcome and latency.
pub fn record_operation(operation: &str, success: bool, duration_ms: f64) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "gateway_requests_total",
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_ms",
        "operation" => operation.to_string()
    )
    .record(duration_ms);
}

/// Record a classified failure.
pub fn record_error(category: &'static str) {
    counter!("gateway_errors_total", "category" => category).increment(1);
}

/// Record a rate-limit violation.
pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

/// Record a breaker transition and update the state gauge.
pub fn record_breaker_transition(resource: &str, state: &'static str) {
    counter!(
        "gateway_breaker_transitions_total",
        "resource" => resource.to_string(),
        "state" => state
    )
    .increment(1);

    let level = match state {
        "closed" => 0.0,
        "half_open" => 1.0,
        _ => 2.0,
    };
    gauge!("gateway_breaker_state", "resource" => resource.to_string()).set(level);
}

/// Record a session lifecycle event (started, revoked, replay_detected,
/// device_registered).
pub fn record_session_event(event: &'static str) {
    counter!("gateway_session_events_total", "event" => event).increment(1);
}
