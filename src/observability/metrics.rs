//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method and status
//! - `proxy_request_duration_seconds` (histogram): time to response headers
//! - `proxy_redirect_hops_total` (counter): upstream redirects followed
//! - `proxy_not_found_contained_total` (counter): not-found pages replaced
//!   by the root, by stage (`redirect`, `guard`)
//! - `proxy_rewrite_fallback_total` (counter): HTML bodies forwarded raw
//!   after a rewriter failure
//! - `proxy_upstream_errors_total` (counter): transport failures

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_redirect_hop() {
    metrics::counter!("proxy_redirect_hops_total").increment(1);
}

pub fn record_not_found_contained(stage: &'static str) {
    metrics::counter!("proxy_not_found_contained_total", "stage" => stage).increment(1);
}

pub fn record_rewrite_fallback() {
    metrics::counter!("proxy_rewrite_fallback_total").increment(1);
}

pub fn record_upstream_error() {
    metrics::counter!("proxy_upstream_errors_total").increment(1);
}
