//! Token validation for the authentication gateway.
//!
//! This module turns a raw bearer token into an [`AuthenticatedUser`] or a
//! typed rejection.
//!
//! # Components
//!
//! - `claims` - claim structures for verified tokens
//! - `jwks` - JWKS client for fetching and caching the issuer's public keys
//! - `scopes` - the scope vocabulary downstream services consume
//! - `validator` - the validation pipeline itself

pub mod claims;
pub mod jwks;
pub mod scopes;
pub mod validator;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use jwks::JwksClient;
pub use validator::TokenValidator;
