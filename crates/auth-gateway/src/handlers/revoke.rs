//! Self-service token revocation handler.
//!
//! Lets an authenticated caller invalidate its own token ahead of
//! expiry, for logout and credential-rotation flows. The revocation
//! marker lives in Redis until the token would have expired anyway, so
//! the set never grows past the population of live tokens.

use crate::auth::AuthenticatedUser;
use crate::errors::AgError;
use crate::observability::metrics::record_token_revocation;
use crate::routes::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for a successful revocation.
#[derive(Debug, Clone, Serialize)]
pub struct RevokeResponse {
    pub message: &'static str,

    /// The `jti` that was revoked, echoed for client-side logging.
    pub jti: String,
}

/// Handler for POST /auth/revoke
///
/// Revokes the token the request authenticated with. Idempotent:
/// revoking an already-revoked jti succeeds again (the middleware
/// rejects replayed revoked tokens before they reach here, so in
/// practice this arm only matters for races).
///
/// Returns 503 if the revocation marker cannot be written; the token
/// remains valid and the caller is expected to retry.
#[instrument(skip_all, name = "ag.handlers.revoke")]
pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<RevokeResponse>, AgError> {
    if let Err(e) = state.revocation.revoke_token(&user.jti, user.exp).await {
        record_token_revocation("error");
        tracing::warn!(
            target: "ag.handlers.revoke",
            "Failed to write revocation marker: {}",
            e
        );
        return Err(e);
    }

    record_token_revocation("success");
    tracing::info!(target: "ag.handlers.revoke", "Token revoked");

    Ok(Json(RevokeResponse {
        message: "Token revoked successfully",
        jti: user.jti,
    }))
}
