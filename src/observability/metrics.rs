//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatewarden_requests_total` (counter): by method, status
//! - `gatewarden_request_duration_seconds` (histogram): admission-to-response
//! - `gatewarden_rate_limited_total` (counter): quota denials by client
//! - `gatewarden_backend_health` (gauge): 1=alive, 0=dead, by backend URL

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed (or rejected) proxied request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gatewarden_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("gatewarden_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// Record a quota denial.
pub fn record_rate_limited(client_id: &str) {
    metrics::counter!(
        "gatewarden_rate_limited_total",
        "client_id" => client_id.to_string(),
    )
    .increment(1);
}

/// Record a backend's probed liveness.
pub fn record_backend_health(backend: &str, alive: bool) {
    metrics::gauge!(
        "gatewarden_backend_health",
        "backend" => backend.to_string(),
    )
    .set(if alive { 1.0 } else { 0.0 });
}
