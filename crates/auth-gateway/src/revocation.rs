//! Token revocation records.
//!
//! Revocation is a blacklist keyed by the token's `jti`. Records carry a
//! TTL matching the token's remaining lifetime: once the token would have
//! expired anyway, the record self-cleans. The store is shared so a token
//! revoked through one gateway replica is refused by all of them.
//!
//! Checks fail closed. If the store cannot answer, validation reports the
//! dependency failure instead of assuming the token is still good.

use async_trait::async_trait;

use crate::errors::AgError;

/// Key prefix for revocation records.
pub const REVOCATION_KEY_PREFIX: &str = "revoked:";

/// Floor for revocation record TTLs, in seconds. Tokens at or past their
/// expiry still get a short-lived record so the revocation is observable.
pub const MIN_REVOCATION_TTL_SECONDS: u64 = 1;

/// Shared revocation record storage.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Whether the token with this `jti` has been revoked.
    async fn is_token_revoked(&self, jti: &str) -> Result<bool, AgError>;

    /// Record the token with this `jti` as revoked until `expires_at`
    /// (unix seconds).
    async fn revoke_token(&self, jti: &str, expires_at: i64) -> Result<(), AgError>;
}

/// Storage key for a token's revocation record.
#[must_use]
pub fn revocation_key(jti: &str) -> String {
    format!("{REVOCATION_KEY_PREFIX}{jti}")
}

/// TTL for a revocation record: the token's remaining lifetime, floored at
/// [`MIN_REVOCATION_TTL_SECONDS`].
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn revocation_ttl(expires_at: i64, now: i64) -> u64 {
    let remaining = expires_at.saturating_sub(now);
    if remaining >= 1 {
        // Non-negative after the check above
        remaining as u64
    } else {
        MIN_REVOCATION_TTL_SECONDS
    }
}
