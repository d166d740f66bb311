//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by endpoint, status
//! - `gateway_request_duration_seconds` (histogram): latency by endpoint
//! - `gateway_rate_limited_total` (counter): requests rejected with 429
//! - `gateway_rate_limit_clients` (gauge): tracked client windows
//! - `gateway_upstream_calls_total` (counter): upstream calls by outcome
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_counter!("gateway_requests_total", "Total requests by endpoint and status");
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Request latency by endpoint"
    );
    describe_counter!("gateway_rate_limited_total", "Requests rejected by the rate limiter");
    describe_gauge!("gateway_rate_limit_clients", "Client windows tracked by the rate limiter");
    describe_counter!("gateway_upstream_calls_total", "Upstream calls by outcome");
    describe_histogram!(
        "gateway_upstream_duration_seconds",
        "Upstream call latency"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

/// Record the number of tracked rate-limit windows.
pub fn record_rate_limit_clients(count: usize) {
    gauge!("gateway_rate_limit_clients").set(count as f64);
}

/// Record an upstream call and its outcome label.
pub fn record_upstream_call(outcome: &'static str, start: Instant) {
    counter!("gateway_upstream_calls_total", "outcome" => outcome).increment(1);
    histogram!("gateway_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}
