//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape
//! metrics. No PII or secrets are exposed in metrics, only operational
//! data with bounded cardinality labels.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus-formatted metrics for scraping. This is an
/// operational endpoint, not versioned under /api/v1.
#[tracing::instrument(skip_all, name = "ag.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

#[cfg(test)]
mod tests {
    // Testing this endpoint requires a PrometheusHandle, which can only
    // be installed once per process via PrometheusBuilder. Integration
    // tests cover the full endpoint; the observability module tests
    // cover metric recording itself.
}
