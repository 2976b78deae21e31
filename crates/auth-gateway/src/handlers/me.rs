//! Current user handler.
//!
//! Returns the authenticated identity extracted from the bearer token.

use crate::auth::AuthenticatedUser;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for the `/api/v1/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Subject (user or client ID).
    pub user_id: String,

    /// Normalized tenant identifier, absent for tenant-less tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Granted scopes in sorted order.
    pub scopes: Vec<String>,

    /// Issuer the token was validated against.
    pub issuer: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Token expiration timestamp (Unix seconds).
    pub exp: i64,
}

/// Handler for GET /api/v1/me
///
/// Returns the identity the auth middleware attached to the request.
/// Requires valid authentication; unauthenticated requests never reach
/// this handler.
#[instrument(skip_all, name = "ag.handlers.me")]
pub async fn get_me(Extension(user): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    tracing::debug!(target: "ag.handlers.me", "Returning authenticated identity");

    // BTreeSet iterates in sorted order, so the response is stable.
    let scopes = user.scopes.iter().cloned().collect();

    Json(MeResponse {
        user_id: user.user_id,
        tenant_id: user.tenant_id,
        scopes,
        issuer: user.issuer,
        email: user.email,
        name: user.name,
        exp: user.exp,
    })
}
