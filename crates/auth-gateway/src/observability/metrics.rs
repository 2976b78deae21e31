//! Metrics definitions for the authentication gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ag_` prefix for the auth gateway
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: the known route set plus "/other"
//! - `status`: success, failure, unavailable
//! - `error_category`: the stable error codes plus "none"
//! - `track`: general, failed_auth
//! - `cache_status`: hit, miss, refresh, error

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded. Histogram buckets
/// target sub-10ms validation on the JWKS cache hit path, with a tail
/// wide enough to see provider fetches.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ag_http_request".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ag_http_requests_total`, `ag_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like:
/// - 404 Not Found
/// - 405 Method Not Allowed
/// - 408 Request Timeout (from the timeout layer)
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    // Normalize endpoint to prevent cardinality explosion
    let normalized_endpoint = normalize_endpoint(endpoint);

    // Determine status category for simplified querying
    let status = categorize_status_code(status_code);

    histogram!("ag_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ag_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Guard that tracks an HTTP request in flight.
///
/// Increments the gauge on creation and decrements when dropped, so
/// early returns and cancellations unwind the count correctly.
pub struct InFlightGuard {
    _private: (),
}

/// Begin tracking one in-flight HTTP request.
///
/// Metric: `ag_http_requests_in_flight`
#[must_use = "the request stays counted until the guard is dropped"]
pub fn track_in_flight() -> InFlightGuard {
    gauge!("ag_http_requests_in_flight").increment(1.0);
    InFlightGuard { _private: () }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("ag_http_requests_in_flight").decrement(1.0);
    }
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// The gateway has no dynamic path segments, so unknown paths collapse
/// straight to "/other".
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/me" => "/api/v1/me",
        "/auth/revoke" => "/auth/revoke",
        _ => "/other",
    }
}

// ============================================================================
// Token Validation Metrics
// ============================================================================

/// Record the outcome of a bearer token validation
///
/// Metric: `ag_token_validations_total`
/// Labels: `status`, `error_category`
///
/// `status` is "success", "failure", or "unavailable"; `error_category`
/// carries the stable error code on rejection and "none" on success.
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");

    counter!("ag_token_validations_total",
        "status" => status.to_string(),
        "error_category" => category.to_string()
    )
    .increment(1);
}

/// Record a self-service token revocation attempt
///
/// Metric: `ag_token_revocations_total`
/// Labels: `status` ("success" or "error")
pub fn record_token_revocation(status: &str) {
    counter!("ag_token_revocations_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a JWKS cache lookup or provider fetch
///
/// Metric: `ag_jwks_requests_total`
/// Labels: `cache_status` ("hit", "miss", "refresh", "error")
pub fn record_jwks_request(cache_status: &str) {
    counter!("ag_jwks_requests_total",
        "cache_status" => cache_status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Rate Limit Metrics
// ============================================================================

/// Record a rate limiter decision for one track
///
/// Metric: `ag_rate_limit_decisions_total`
/// Labels: `track` ("general" or "failed_auth"), `action` ("allowed" or "limited")
pub fn record_rate_limit_decision(track: &str, action: &str) {
    counter!("ag_rate_limit_decisions_total",
        "track" => track.to_string(),
        "action" => action.to_string()
    )
    .increment(1);
}
