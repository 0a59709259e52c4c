//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_health_checks_total` (counter): checks by backend, outcome
//! - `edge_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `edge_chaos_injections_total` (counter): injected faults by kind
//! - `edge_recoveries_total` (counter): recoveries by backend, kind
//! - `edge_proxy_requests_total` (counter): proxied requests by method, status, backend
//! - `edge_proxy_request_duration_seconds` (histogram): proxy latency by backend
//!
//! Without an installed recorder every call is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_health_check(backend: &str, healthy: bool) {
    let outcome = if healthy { "healthy" } else { "unhealthy" };
    metrics::counter!("edge_health_checks_total", "backend" => backend.to_string(), "outcome" => outcome)
        .increment(1);
    metrics::gauge!("edge_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_chaos_injection(kind: &'static str) {
    metrics::counter!("edge_chaos_injections_total", "kind" => kind).increment(1);
}

pub fn record_recovery(backend: &str, kind: &'static str) {
    metrics::counter!("edge_recoveries_total", "backend" => backend.to_string(), "kind" => kind).increment(1);
}

pub fn record_proxy_request(method: &str, status: u16, backend: &str, start: Instant) {
    metrics::counter!(
        "edge_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    metrics::histogram!("edge_proxy_request_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}
