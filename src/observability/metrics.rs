//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy request metrics
//! - Expose a Prometheus-compatible scrape endpoint when configured
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, subpath
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Unmatched requests are labelled with subpath `none`

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, subpath: &str, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("subpath", subpath.to_string()),
    ];

    metrics::counter!("proxy_requests_total", &labels).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", &labels).record(duration.as_secs_f64());
}
