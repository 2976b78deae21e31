//! Health check handlers.
//!
//! Provides health check endpoints for Kubernetes liveness and readiness probes.
//!
//! - `/health`: Liveness probe, returns OK if the process is running
//! - `/ready`: Readiness probe, checks the Redis dependency

use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Key probed by the readiness check. Never written, so the lookup is a
/// cheap EXISTS that exercises the full connection path.
const READINESS_PROBE_KEY: &str = "readiness:probe";

/// Response body for the readiness probe.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe handler.
///
/// Returns a simple "OK" response to indicate the process is running.
/// Does NOT check any dependencies, failure means the process is hung.
///
/// Kubernetes will kill and restart the pod if this fails.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Checks Redis connectivity, the one dependency the gateway cannot
/// serve traffic without: revocation checks fail closed, so a pod with
/// a dead Redis connection would reject every request with 503.
///
/// Returns 200 if ready, 503 if not ready. Kubernetes removes the pod
/// from the load balancer while this fails.
///
/// ## Security
///
/// Error messages are intentionally generic to avoid leaking
/// infrastructure details. Actual errors are logged server-side.
#[tracing::instrument(skip_all, name = "ag.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.revocation.is_token_revoked(READINESS_PROBE_KEY).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                redis: Some("healthy"),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "ag.health", "Readiness check failed: redis error: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    redis: Some("unhealthy"),
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
