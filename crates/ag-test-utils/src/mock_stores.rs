//! In-memory store mocks for gateway testing.
//!
//! Provides in-memory implementations of the gateway's store seams:
//! - `MockRateLimitStore` for the fixed-window rate limit counters
//! - `MockRevocationStore` for the revocation set
//!
//! Both support failure injection so fail-closed paths can be tested
//! without tearing down a real Redis.
//!
//! # Example
//!
//! ```rust,ignore
//! use ag_test_utils::{MockRateLimitStore, MockRevocationStore};
//!
//! let limits = MockRateLimitStore::new().with_failing_prefix("ratelimit:failed_auth:");
//! let revocations = MockRevocationStore::new().with_revoked("jti-123");
//! ```

use async_trait::async_trait;
use auth_gateway::errors::AgError;
use auth_gateway::rate_limit::RateLimitStore;
use auth_gateway::revocation::RevocationStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock rate limit counter store.
///
/// Counts increments per key in memory. Counter expiry is ignored:
/// window keys already carry the window index, so a test never reuses
/// a stale counter unless it pins the clock on purpose.
#[derive(Debug, Clone)]
pub struct MockRateLimitStore {
    inner: Arc<Mutex<RateLimitInner>>,
}

#[derive(Debug, Default)]
struct RateLimitInner {
    /// Counter value per key.
    counts: HashMap<String, u64>,
    /// Every key passed to `increment`, in call order.
    calls: Vec<String>,
    /// Fail every increment.
    fail_all: bool,
    /// Fail increments whose key starts with this prefix.
    fail_prefix: Option<String>,
}

impl Default for MockRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRateLimitStore {
    /// Create a new empty counter store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimitInner::default())),
        }
    }

    /// Create a store where every increment fails, mimicking an
    /// unreachable Redis.
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().fail_all = true;
        store
    }

    /// Fail only increments whose key starts with `prefix`.
    ///
    /// Lets a test break one track (e.g. `ratelimit:failed_auth:`)
    /// while the other keeps counting.
    #[must_use]
    pub fn with_failing_prefix(self, prefix: &str) -> Self {
        self.inner.lock().unwrap().fail_prefix = Some(prefix.to_string());
        self
    }

    /// Every key passed to `increment`, in call order.
    #[must_use]
    pub fn recorded_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Current counter value for a key.
    #[must_use]
    pub fn count(&self, key: &str) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .counts
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RateLimitStore for MockRateLimitStore {
    async fn increment(&self, key: &str, _expire_seconds: u64) -> Result<u64, AgError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(key.to_string());

        let prefix_failed = inner
            .fail_prefix
            .as_deref()
            .is_some_and(|p| key.starts_with(p));
        if inner.fail_all || prefix_failed {
            return Err(AgError::unavailable("Service temporarily unavailable"));
        }

        let count = inner.counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

/// Mock revocation store.
///
/// Holds revoked token IDs in memory and records every `revoke_token`
/// call for assertions.
#[derive(Debug, Clone)]
pub struct MockRevocationStore {
    inner: Arc<Mutex<RevocationInner>>,
}

#[derive(Debug, Default)]
struct RevocationInner {
    /// Revoked jti values with the expiry passed at revocation time.
    revoked: HashMap<String, i64>,
    /// Every (jti, expires_at) passed to `revoke_token`, in call order.
    revoke_calls: Vec<(String, i64)>,
    /// Fail `is_token_revoked` lookups.
    fail_checks: bool,
    /// Fail `revoke_token` writes.
    fail_revocations: bool,
}

impl Default for MockRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRevocationStore {
    /// Create a new empty revocation store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RevocationInner::default())),
        }
    }

    /// Pre-revoke a token ID.
    #[must_use]
    pub fn with_revoked(self, jti: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .revoked
            .insert(jti.to_string(), i64::MAX);
        self
    }

    /// Fail every revocation lookup, mimicking an unreachable Redis.
    #[must_use]
    pub fn with_failing_checks(self) -> Self {
        self.inner.lock().unwrap().fail_checks = true;
        self
    }

    /// Fail every revocation write.
    #[must_use]
    pub fn with_failing_revocations(self) -> Self {
        self.inner.lock().unwrap().fail_revocations = true;
        self
    }

    /// Every (jti, expires_at) passed to `revoke_token`, in call order.
    #[must_use]
    pub fn revoke_calls(&self) -> Vec<(String, i64)> {
        self.inner.lock().unwrap().revoke_calls.clone()
    }

    /// Whether a jti is currently marked revoked.
    #[must_use]
    pub fn contains(&self, jti: &str) -> bool {
        self.inner.lock().unwrap().revoked.contains_key(jti)
    }
}

#[async_trait]
impl RevocationStore for MockRevocationStore {
    async fn is_token_revoked(&self, jti: &str) -> Result<bool, AgError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_checks {
            return Err(AgError::unavailable(
                "Unable to verify token revocation status",
            ));
        }
        Ok(inner.revoked.contains_key(jti))
    }

    async fn revoke_token(&self, jti: &str, expires_at: i64) -> Result<(), AgError> {
        let mut inner = self.inner.lock().unwrap();
        inner.revoke_calls.push((jti.to_string(), expires_at));

        if inner.fail_revocations {
            return Err(AgError::unavailable("Unable to revoke token at this time"));
        }

        inner.revoked.insert(jti.to_string(), expires_at);
        Ok(())
    }
}
