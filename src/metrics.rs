//! Prometheus metrics for the API pipeline.
//!
//! Metrics are exposed by a dedicated HTTP listener (default port 9090)
//! separate from the API itself, so scrapes never compete with client
//! traffic for rate-limit budget.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `api_requests_total` - Requests served (labels: method, status)
//! - `api_rate_limit_denials_total` - 429s issued (label: category)
//! - `api_auth_failures_total` - Rejected authentications (label: reason)
//! - `api_auth_successes_total` - Accepted authentications
//! - `api_validation_rejections_total` - Payloads refused (label: reason)
//!
//! ## Gauges
//! - `api_rate_limit_tracked_clients` - Distinct client IPs tracked

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "api_requests_total";
    pub const RATE_LIMIT_DENIALS_TOTAL: &str = "api_rate_limit_denials_total";
    pub const AUTH_FAILURES_TOTAL: &str = "api_auth_failures_total";
    pub const AUTH_SUCCESSES_TOTAL: &str = "api_auth_successes_total";
    pub const VALIDATION_REJECTIONS_TOTAL: &str = "api_validation_rejections_total";
    pub const RATE_LIMIT_TRACKED_CLIENTS: &str = "api_rate_limit_tracked_clients";
}

/// Install the Prometheus exporter and register metric descriptions.
///
/// # Errors
///
/// Returns an error message when the exporter fails to install, usually
/// because the metrics port is already bound.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(names::REQUESTS_TOTAL, "Total HTTP requests served");
    describe_counter!(
        names::RATE_LIMIT_DENIALS_TOTAL,
        "Requests denied by the rate limiter"
    );
    describe_counter!(names::AUTH_FAILURES_TOTAL, "Rejected authentication attempts");
    describe_counter!(names::AUTH_SUCCESSES_TOTAL, "Accepted authentication attempts");
    describe_counter!(
        names::VALIDATION_REJECTIONS_TOTAL,
        "Request payloads refused by validation"
    );
    describe_gauge!(
        names::RATE_LIMIT_TRACKED_CLIENTS,
        "Distinct client IPs currently tracked by the rate limiter"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Initialize metrics if possible; log and continue otherwise.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record a served request.
pub fn record_request(method: &str, status: u16) {
    counter!(names::REQUESTS_TOTAL, "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record a rate-limit denial for a budget category.
pub fn record_rate_limit_denial(category: &'static str) {
    counter!(names::RATE_LIMIT_DENIALS_TOTAL, "category" => category).increment(1);
}

/// Record a failed authentication attempt.
pub fn record_auth_failure(reason: &'static str) {
    counter!(names::AUTH_FAILURES_TOTAL, "reason" => reason).increment(1);
}

/// Record a successful authentication.
pub fn record_auth_success() {
    counter!(names::AUTH_SUCCESSES_TOTAL).increment(1);
}

/// Record a payload rejected by validation.
pub fn record_validation_rejection(reason: &'static str) {
    counter!(names::VALIDATION_REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

/// Update the tracked-clients gauge.
pub fn set_tracked_clients(count: usize) {
    gauge!(names::RATE_LIMIT_TRACKED_CLIENTS).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These verify the recording functions don't panic without an
    // installed exporter; scrape output needs an integration setup.

    #[test]
    fn test_record_request() {
        record_request("GET", 200);
    }

    #[test]
    fn test_record_rate_limit_denial() {
        record_rate_limit_denial("per_minute");
    }

    #[test]
    fn test_record_auth_events() {
        record_auth_failure("invalid_key");
        record_auth_success();
    }

    #[test]
    fn test_record_validation_rejection() {
        record_validation_rejection("invalid_payload");
    }

    #[test]
    fn test_set_tracked_clients() {
        set_tracked_clients(0);
        set_tracked_clients(42);
    }
}
