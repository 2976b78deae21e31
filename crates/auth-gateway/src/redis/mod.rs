//! Redis-backed shared state.
//!
//! This module provides:
//! - `RedisClient` - one client backing both shared stores the gateway
//!   needs: rate limit counters and token revocation records
//! - Lua scripts for atomic counter operations
//!
//! # Key Patterns
//!
//! - `ratelimit:{track}:{client}:{window}` - Fixed-window request counter
//! - `revoked:{jti}` - Token revocation record, TTL matches the token's
//!   remaining lifetime

pub mod client;
pub mod lua_scripts;

pub use client::RedisClient;
