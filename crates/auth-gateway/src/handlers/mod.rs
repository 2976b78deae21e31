//! HTTP request handlers for the authentication gateway.

pub mod health;
pub mod me;
pub mod metrics;
pub mod revoke;

pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
pub use revoke::revoke_token;
