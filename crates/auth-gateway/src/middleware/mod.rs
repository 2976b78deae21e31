//! Request middleware.
//!
//! - `auth` - the authentication gate: rate limiting, token extraction and
//!   validation, identity injection
//! - `http_metrics` - request metrics for every response, including
//!   framework-level errors

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState};
pub use http_metrics::http_metrics_middleware;
