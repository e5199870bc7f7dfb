//! Metrics collection and exposition.
//!
//! # Metrics
//! - `devserver_requests_total` (counter): requests by method, status, handler
//! - `devserver_request_duration_seconds` (histogram): latency distribution
//! - `devserver_cgi_exits_total` (counter): reaped CGI processes by outcome
//! - `devserver_gateway_errors_total` (counter): gateway failures by kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record a finished request. `handler` is `cgi`, `static` or `none`.
pub fn record_request(method: &str, status: u16, handler: &'static str, start: Instant) {
    counter!(
        "devserver_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "handler" => handler
    )
    .increment(1);
    histogram!("devserver_request_duration_seconds", "handler" => handler)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cgi_exit(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("devserver_cgi_exits_total", "outcome" => outcome).increment(1);
}

pub fn record_gateway_error(kind: &'static str) {
    counter!("devserver_gateway_errors_total", "kind" => kind).increment(1);
}
