//! Error types for the authentication gateway.
//!
//! Every failure a client can observe maps to one of the [`AgError`]
//! variants. The HTTP rendering is deliberately coarse: internal details
//! stay in the server logs, clients get a stable error code plus a short
//! human-readable description.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::rate_limit::RateLimitTrack;

/// Authentication gateway error.
#[derive(Debug, Error)]
pub enum AgError {
    /// No usable Bearer token in the Authorization header.
    #[error("missing bearer token")]
    MissingToken,

    /// Token failed validation. The payload is the client-visible reason.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token is past its expiry (beyond the configured skew).
    #[error("token expired")]
    ExpiredToken,

    /// Client exceeded one of the rate limit tracks.
    #[error("rate limit exceeded on {track} track")]
    RateLimitExceeded {
        track: RateLimitTrack,
        retry_after_seconds: u64,
    },

    /// A dependency needed for a trustworthy decision is unreachable.
    /// Validation fails closed rather than skipping the check.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Client-visible error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_description: String,
}

impl AgError {
    /// Token rejected with a client-visible reason.
    pub fn invalid(description: impl Into<String>) -> Self {
        AgError::InvalidToken(description.into())
    }

    /// Dependency failure with a client-visible reason.
    pub fn unavailable(description: impl Into<String>) -> Self {
        AgError::ServiceUnavailable(description.into())
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgError::MissingToken | AgError::InvalidToken(_) | AgError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AgError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AgError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            AgError::MissingToken => "missing_token",
            AgError::InvalidToken(_) => "invalid_token",
            AgError::ExpiredToken => "expired_token",
            AgError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            AgError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// Client-visible description.
    #[must_use]
    pub fn error_description(&self) -> String {
        match self {
            AgError::MissingToken => {
                "Authorization header with Bearer token is required".to_string()
            }
            AgError::InvalidToken(description) => description.clone(),
            AgError::ExpiredToken => "JWT token has expired".to_string(),
            AgError::RateLimitExceeded {
                track: RateLimitTrack::General,
                ..
            } => "Too many authentication attempts. Please try again later.".to_string(),
            AgError::RateLimitExceeded {
                track: RateLimitTrack::FailedAuth,
                ..
            } => "Too many failed authentication attempts. Please try again later.".to_string(),
            AgError::ServiceUnavailable(description) => description.clone(),
        }
    }

    /// Whether this error counts as a failed authentication attempt for
    /// rate limiting purposes. Dependency failures do not count: the
    /// client presented nothing we proved bad.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            AgError::MissingToken | AgError::InvalidToken(_) | AgError::ExpiredToken
        )
    }
}

impl IntoResponse for AgError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let retry_after = match &self {
            AgError::RateLimitExceeded {
                retry_after_seconds,
                ..
            } => Some(*retry_after_seconds),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(
                target: "ag.http",
                status = status.as_u16(),
                error = %self,
                "request failed"
            );
        }

        let body = ErrorResponse {
            error: self.error_code().to_string(),
            error_description: self.error_description(),
        };

        let mut response = (status, Json(body)).into_response();

        let headers = response.headers_mut();
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                headers.insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
