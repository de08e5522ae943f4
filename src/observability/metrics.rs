//! Metrics collection and exposition.
//!
//! # Metrics
//! - `soulgrid_requests_total` (counter): requests by method, status
//! - `soulgrid_request_duration_seconds` (histogram): latency distribution
//! - `soulgrid_rate_limited_total` (counter): requests rejected with 429
//! - `soulgrid_rate_limit_keys` (gauge): keys tracked after the last sweep
//! - `soulgrid_souls_created_total` (counter): new souls
//! - `soulgrid_claims_total` (counter): paint attempts by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "soulgrid_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("soulgrid_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("soulgrid_rate_limited_total").increment(1);
}

pub fn record_rate_limit_keys(tracked: usize) {
    gauge!("soulgrid_rate_limit_keys").set(tracked as f64);
}

pub fn record_soul_created() {
    counter!("soulgrid_souls_created_total").increment(1);
}

pub fn record_claim(outcome: &'static str) {
    counter!("soulgrid_claims_total", "outcome" => outcome).increment(1);
}
