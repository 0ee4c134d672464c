//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (default port 9090).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `fortune_http_requests_total` - Completed HTTP requests (labels: method, status)
//! - `fortune_rate_limit_admitted_total` - Requests admitted by the limiter
//! - `fortune_rate_limit_rejected_total` - Requests rejected with 429
//! - `fortune_llm_requests_total` - Upstream completion calls (label: status)
//!
//! ## Histograms
//! - `fortune_http_request_duration_seconds` - End-to-end request latency
//! - `fortune_llm_request_duration_seconds` - Upstream completion latency
//!
//! ## Gauges
//! - `fortune_rate_limit_tracked_keys` - Keys currently held in the limiter table
//!
//! Recording functions are no-ops until [`init_metrics`] installs a recorder,
//! so they are safe to call from tests.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "fortune_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "fortune_http_request_duration_seconds";
    pub const RATE_LIMIT_ADMITTED_TOTAL: &str = "fortune_rate_limit_admitted_total";
    pub const RATE_LIMIT_REJECTED_TOTAL: &str = "fortune_rate_limit_rejected_total";
    pub const RATE_LIMIT_TRACKED_KEYS: &str = "fortune_rate_limit_tracked_keys";
    pub const LLM_REQUESTS_TOTAL: &str = "fortune_llm_requests_total";
    pub const LLM_REQUEST_DURATION_SECONDS: &str = "fortune_llm_request_duration_seconds";
}

/// Install the Prometheus exporter and describe all metrics.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (e.g. port in use
/// or a recorder is already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::HTTP_REQUESTS_TOTAL,
        "Total number of completed HTTP requests"
    );
    describe_counter!(
        names::RATE_LIMIT_ADMITTED_TOTAL,
        "Total number of requests admitted by the rate limiter"
    );
    describe_counter!(
        names::RATE_LIMIT_REJECTED_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
    describe_counter!(
        names::LLM_REQUESTS_TOTAL,
        "Total number of upstream LLM completion calls"
    );

    describe_histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds, including middleware"
    );
    describe_histogram!(
        names::LLM_REQUEST_DURATION_SECONDS,
        "Upstream LLM completion duration in seconds"
    );

    describe_gauge!(
        names::RATE_LIMIT_TRACKED_KEYS,
        "Number of client keys currently tracked by the rate limiter"
    );

    info!(addr = %metrics_addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record a completed HTTP request and its latency.
pub fn record_http_request(method: &str, status: u16, duration_secs: f64) {
    counter!(names::HTTP_REQUESTS_TOTAL, "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration_secs);
}

/// Record a limiter admission.
pub fn record_rate_limit_admitted() {
    counter!(names::RATE_LIMIT_ADMITTED_TOTAL).increment(1);
}

/// Record a limiter rejection.
pub fn record_rate_limit_rejected() {
    counter!(names::RATE_LIMIT_REJECTED_TOTAL).increment(1);
}

/// Update the tracked-keys gauge.
pub fn record_tracked_keys(count: usize) {
    gauge!(names::RATE_LIMIT_TRACKED_KEYS).set(count as f64);
}

/// Record an upstream LLM call.
pub fn record_llm_request(status: &str, duration_secs: f64) {
    counter!(names::LLM_REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
    histogram!(names::LLM_REQUEST_DURATION_SECONDS).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These only verify recording without an installed recorder doesn't panic.

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", 200, 0.1);
    }

    #[test]
    fn test_record_rate_limit_counters() {
        record_rate_limit_admitted();
        record_rate_limit_rejected();
        record_tracked_keys(3);
    }

    #[test]
    fn test_record_llm_request() {
        record_llm_request("success", 1.2);
        record_llm_request("error", 0.3);
    }
}
