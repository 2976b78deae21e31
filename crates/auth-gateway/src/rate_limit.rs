//! Distributed fixed-window rate limiting.
//!
//! Two independent tracks share one implementation: a general track counting
//! every request through the gate, and a failed-auth track counting only
//! rejected authentication attempts. Counters live in a shared store so
//! every gateway replica sees the same totals.
//!
//! The window is fixed, not sliding: requests land in the window numbered
//! `now / window_seconds`, and each window's counter expires with the
//! window. A client can at worst double its budget by straddling a window
//! boundary, which is an accepted property of this scheme.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::errors::AgError;
use crate::observability::metrics::record_rate_limit_decision;

/// Which counter a request lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTrack {
    /// Every request entering the authentication gate.
    General,
    /// Only requests that were rejected with an authentication error.
    FailedAuth,
}

impl RateLimitTrack {
    /// Segment used in storage keys and metric labels.
    #[must_use]
    pub fn key_segment(&self) -> &'static str {
        match self {
            RateLimitTrack::General => "general",
            RateLimitTrack::FailedAuth => "failed_auth",
        }
    }
}

impl fmt::Display for RateLimitTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_segment())
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

/// Atomic counter storage for rate limit windows.
///
/// `increment` must atomically bump the counter at `key`, set the key to
/// expire `expire_seconds` after its first increment, and return the new
/// count. Production uses a Redis Lua script; tests substitute in-memory
/// doubles.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn increment(&self, key: &str, expire_seconds: u64) -> Result<u64, AgError>;
}

/// Fixed-window rate limiter over a shared counter store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    enabled: bool,
    general_limit: u32,
    failed_auth_limit: u32,
    window_seconds: u64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn RateLimitStore>, config: &Config) -> Self {
        Self {
            store,
            enabled: config.rate_limit_enabled,
            general_limit: config.rate_limit_requests_per_minute,
            failed_auth_limit: config.rate_limit_failed_auth_per_minute,
            window_seconds: config.rate_limit_window_seconds,
        }
    }

    /// Count a request against `track` for `client_id` and decide whether
    /// it may proceed.
    ///
    /// Errors from the store propagate: a limiter that cannot count cannot
    /// authorize, so callers turn store failures into 503 responses.
    #[tracing::instrument(skip_all, name = "rate_limit.check", fields(track = %track))]
    pub async fn check(
        &self,
        client_id: &str,
        track: RateLimitTrack,
    ) -> Result<RateLimitDecision, AgError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AgError::unavailable("Service temporarily unavailable"))?
            .as_secs();
        self.check_at(client_id, track, now).await
    }

    /// `check` with an explicit clock, for deterministic window tests.
    pub(crate) async fn check_at(
        &self,
        client_id: &str,
        track: RateLimitTrack,
        now_unix: u64,
    ) -> Result<RateLimitDecision, AgError> {
        if !self.enabled {
            return Ok(RateLimitDecision::Allowed);
        }

        let window_index = now_unix / self.window_seconds;
        let key = format!(
            "ratelimit:{}:{}:{}",
            track.key_segment(),
            client_id,
            window_index
        );

        let count = self.store.increment(&key, self.window_seconds).await?;

        let limit = match track {
            RateLimitTrack::General => self.general_limit,
            RateLimitTrack::FailedAuth => self.failed_auth_limit,
        };

        let decision = if count > u64::from(limit) {
            let retry_after_seconds = self.window_seconds - (now_unix % self.window_seconds);
            tracing::warn!(
                target: "ag.rate_limit",
                client_id,
                track = %track,
                count,
                limit,
                "rate limit exceeded"
            );
            RateLimitDecision::Limited {
                retry_after_seconds,
            }
        } else {
            RateLimitDecision::Allowed
        };

        let action = match decision {
            RateLimitDecision::Allowed => "allowed",
            RateLimitDecision::Limited { .. } => "limited",
        };
        record_rate_limit_decision(track.key_segment(), action);

        Ok(decision)
    }
}
