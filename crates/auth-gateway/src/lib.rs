//! Gatehouse Authentication Gateway Library
//!
//! This library provides the core functionality for Gatehouse - an OAuth2
//! resource-server authentication gateway responsible for:
//!
//! - Bearer token validation against the OAuth provider's published JWKS
//! - Algorithm allow-listing with HMAC key-confusion defenses
//! - Token revocation (Redis-backed blacklist with natural TTL expiry)
//! - Multi-tenant claim extraction and UUID normalization
//! - Distributed rate limiting of authentication attempts
//!
//! # Architecture
//!
//! Requests flow through the authentication gate middleware before reaching
//! any protected handler:
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/validator.rs
//!                                          |- auth/jwks.rs      (key resolution)
//!                                          |- revocation.rs     (blacklist check)
//!                                          `- rate_limit.rs     (attempt counting)
//! ```
//!
//! All cross-instance state (revocation records, rate-limit counters) lives in
//! Redis; the only in-process cache is the issuer's JWKS set.
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error taxonomy with HTTP status code mapping
//! - `auth` - JWKS client, token validator, claims and scopes
//! - `rate_limit` - Fixed-window distributed rate limiting
//! - `revocation` - Token revocation store
//! - `redis` - Redis client backing both stores
//! - `middleware` - Authentication gate and HTTP metrics layers
//! - `handlers` - HTTP request handlers
//! - `observability` - Metrics recorders
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod rate_limit;
pub mod redis;
pub mod revocation;
pub mod routes;
