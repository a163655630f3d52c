//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by method, status
//! - `router_request_duration_seconds` (histogram): routing latency
//! - `realtime_connections` (gauge): connected transports
//! - `realtime_topic_instances` (gauge): cached topic controllers
//! - `realtime_updates_total` (counter): pushed events by kind

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [("method", method.to_string()), ("status", status.to_string())];
    metrics::counter!("router_requests_total", &labels).increment(1);
    metrics::histogram!("router_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_connections(count: usize) {
    metrics::gauge!("realtime_connections").set(count as f64);
}

pub fn record_topic_instances(count: usize) {
    metrics::gauge!("realtime_topic_instances").set(count as f64);
}

/// `kind` is `time_update` or `error`.
pub fn record_update(kind: &'static str) {
    metrics::counter!("realtime_updates_total", "kind" => kind).increment(1);
}
