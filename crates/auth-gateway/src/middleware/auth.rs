//! The authentication gate.
//!
//! Every protected route passes through [`require_auth`], which runs the
//! full admission sequence:
//!
//! 1. Count the request on the general rate limit track; over the limit
//!    means 429 before the token is even looked at
//! 2. Extract the Bearer token from the Authorization header
//! 3. Validate the token
//! 4. On rejection, count the attempt on the failed-auth track; if that
//!    tighter limit is now exceeded, the 429 replaces the 401
//!
//! Dependency failures (503) are never counted as failed authentication:
//! the client presented nothing that was proven bad. Likewise, if the
//! failed-auth counter itself cannot be updated, the original rejection is
//! returned; a broken counter must not upgrade or suppress errors.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::IntoResponse;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;

use crate::auth::TokenValidator;
use crate::errors::AgError;
use crate::observability::metrics::record_token_validation;
use crate::rate_limit::{RateLimitDecision, RateLimitTrack, RateLimiter};

/// State for the authentication gate.
#[derive(Clone)]
pub struct AuthState {
    /// Token validation pipeline.
    pub validator: Arc<TokenValidator>,
    /// Shared rate limiter for both tracks.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AuthState {
    /// Count a rejection on the failed-auth track and decide the final
    /// error: the tighter limit being exceeded turns the rejection into a
    /// 429, a counting failure leaves the original rejection in place.
    async fn record_rejection(&self, client_ip: &str, error: AgError) -> AgError {
        if !error.is_auth_rejection() {
            return error;
        }

        match self
            .rate_limiter
            .check(client_ip, RateLimitTrack::FailedAuth)
            .await
        {
            Ok(RateLimitDecision::Limited {
                retry_after_seconds,
            }) => AgError::RateLimitExceeded {
                track: RateLimitTrack::FailedAuth,
                retry_after_seconds,
            },
            Ok(RateLimitDecision::Allowed) => error,
            Err(store_error) => {
                tracing::warn!(
                    target: "ag.middleware.auth",
                    error = %store_error,
                    "Failed to count rejected attempt, returning original error"
                );
                error
            }
        }
    }
}

/// Client identifier for rate limiting: the peer IP when the connection
/// info is available, a shared bucket otherwise.
fn client_ip(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

/// Extract the Bearer token from the Authorization header.
///
/// The scheme comparison is case-insensitive (RFC 7235), so `bearer`
/// and `BEARER` carry tokens too. A missing header and a non-Bearer
/// scheme are the same failure: the request carries no usable token.
fn extract_bearer_token(req: &Request) -> Result<&str, AgError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "ag.middleware.auth", "Missing Authorization header");
            AgError::MissingToken
        })?;

    match auth_header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("Bearer") => Ok(token),
        _ => {
            tracing::debug!(
                target: "ag.middleware.auth",
                "Authorization header is not a Bearer token"
            );
            Err(AgError::MissingToken)
        }
    }
}

/// Authentication middleware for protected routes.
///
/// # Response
///
/// - 429 if either rate limit track is exceeded
/// - 401 if the token is missing, invalid, expired or revoked
/// - 503 if a dependency needed for the decision is unreachable
/// - Continues to the next handler with [`crate::auth::AuthenticatedUser`]
///   in request extensions when the token is valid
#[instrument(skip_all, name = "ag.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AgError> {
    let client_ip = client_ip(&req);

    // Every request through the gate counts on the general track
    if let RateLimitDecision::Limited {
        retry_after_seconds,
    } = state
        .rate_limiter
        .check(&client_ip, RateLimitTrack::General)
        .await?
    {
        return Err(AgError::RateLimitExceeded {
            track: RateLimitTrack::General,
            retry_after_seconds,
        });
    }

    let token = match extract_bearer_token(&req) {
        Ok(token) => token.to_string(),
        Err(error) => {
            record_token_validation("failure", Some(error.error_code()));
            return Err(state.record_rejection(&client_ip, error).await);
        }
    };

    match state.validator.validate(&token).await {
        Ok(user) => {
            record_token_validation("success", None);
            // Store the identity in request extensions for downstream handlers
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(error) => {
            let status = if error.is_auth_rejection() {
                "failure"
            } else {
                "unavailable"
            };
            record_token_validation(status, Some(error.error_code()));
            Err(state.record_rejection(&client_ip, error).await)
        }
    }
}
