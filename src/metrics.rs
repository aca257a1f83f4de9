//! Prometheus metrics for request and store latency.
//!
//! This module provides:
//! - HTTP request latency per endpoint
//! - Store operation latency per operation
//! - Counters for failed requests by status class

use std::time::Instant;

use axum::http::StatusCode;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Store operation latency metric name.
pub const METRIC_STORE_LATENCY: &str = "store_operation_latency_ms";
/// Failed requests counter metric name.
pub const METRIC_REQUEST_ERRORS: &str = "http_request_errors_total";

/// Install the Prometheus recorder and register metric descriptions.
///
/// Call this once at startup. The returned handle renders the scrape body.
pub fn init_metrics() -> Result<PrometheusHandle, String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| e.to_string())?;

    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_STORE_LATENCY,
        "Store operation latency in milliseconds"
    );
    describe_counter!(
        METRIC_REQUEST_ERRORS,
        "Total number of requests answered with an error status"
    );

    debug!("Metrics initialized");
    Ok(handle)
}

/// Increment the failed request counter.
pub fn inc_request_errors(status: StatusCode) {
    let class = if status.is_server_error() { "5xx" } else { "4xx" };
    counter!(METRIC_REQUEST_ERRORS, "class" => class).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
    label: (&'static str, &'static str),
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric and label.
    pub fn new(metric_name: &'static str, label: (&'static str, &'static str)) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
            label,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let (key, value) = self.label;
        histogram!(self.metric_name, key => value).record(self.elapsed_ms());
    }
}

/// Create a latency timer for an HTTP endpoint.
pub fn timer_request(endpoint: &'static str) -> LatencyTimer {
    LatencyTimer::new(METRIC_HTTP_REQUEST_LATENCY, ("endpoint", endpoint))
}

/// Create a latency timer for a store operation.
pub fn timer_store(op: &'static str) -> LatencyTimer {
    LatencyTimer::new(METRIC_STORE_LATENCY, ("op", op))
}
