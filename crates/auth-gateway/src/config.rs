//! Authentication gateway configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::jwt::{is_hmac_algorithm, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default allowed signature algorithms (comma-separated).
pub const DEFAULT_ALLOWED_ALGORITHMS: &str = "RS256";

/// Default JWKS cache TTL in seconds (1 hour).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 3600;

/// Default JWKS HTTP fetch timeout in seconds.
pub const DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Default general rate limit in requests per minute per client.
pub const DEFAULT_RATE_LIMIT_RPM: u32 = 100;

/// Default failed-authentication rate limit per minute per client.
pub const DEFAULT_RATE_LIMIT_FAILED_AUTH_RPM: u32 = 10;

/// Default rate limit window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

/// Default name of the claim carrying the tenant identifier.
pub const DEFAULT_TENANT_CLAIM_NAME: &str = "tenant_id";

/// Authentication gateway configuration.
///
/// Loaded from environment variables with sensible defaults. The Redis URL
/// is held as a [`SecretString`] and redacted in Debug output because it can
/// embed credentials.
#[derive(Clone)]
pub struct Config {
    /// OAuth issuer URL whose tokens this gateway accepts (exact `iss` match).
    pub oauth_issuer_url: String,

    /// Expected audience; must appear in the token's `aud` claim.
    pub oauth_audience: String,

    /// Signature algorithm allow-list. Asymmetric algorithms only; the
    /// HMAC family is refused at load time.
    pub allowed_algorithms: Vec<String>,

    /// JWKS endpoint URL. Derived from the issuer URL unless overridden.
    pub jwks_url: String,

    /// JWKS cache TTL in seconds.
    pub jwks_cache_ttl_seconds: u64,

    /// JWKS HTTP fetch timeout in seconds.
    pub jwks_http_timeout_seconds: u64,

    /// JWT clock skew tolerance in seconds (applied to `exp` leeway and the
    /// future-`iat` bound). Zero disables the tolerance.
    pub jwt_clock_skew_seconds: i64,

    /// Redis connection URL (revocation records and rate-limit counters).
    pub redis_url: SecretString,

    /// Master switch for both rate-limit tracks.
    pub rate_limit_enabled: bool,

    /// General request threshold per client per window.
    pub rate_limit_requests_per_minute: u32,

    /// Failed-authentication threshold per client per window.
    /// Always strictly below the general threshold.
    pub rate_limit_failed_auth_per_minute: u32,

    /// Rate limit window length in seconds.
    pub rate_limit_window_seconds: u64,

    /// Name of the claim carrying the tenant identifier.
    pub tenant_claim_name: String,

    /// Whether tokens must carry the tenant claim.
    pub require_tenant_claim: bool,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("oauth_issuer_url", &self.oauth_issuer_url)
            .field("oauth_audience", &self.oauth_audience)
            .field("allowed_algorithms", &self.allowed_algorithms)
            .field("jwks_url", &self.jwks_url)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field(
                "jwks_http_timeout_seconds",
                &self.jwks_http_timeout_seconds,
            )
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("redis_url", &"[REDACTED]")
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field(
                "rate_limit_requests_per_minute",
                &self.rate_limit_requests_per_minute,
            )
            .field(
                "rate_limit_failed_auth_per_minute",
                &self.rate_limit_failed_auth_per_minute,
            )
            .field(
                "rate_limit_window_seconds",
                &self.rate_limit_window_seconds,
            )
            .field("tenant_claim_name", &self.tenant_claim_name)
            .field("require_tenant_claim", &self.require_tenant_claim)
            .field("bind_address", &self.bind_address)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer configuration: {0}")]
    InvalidIssuerUrl(String),

    #[error("Invalid algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS configuration: {0}")]
    InvalidJwks(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid tenant claim configuration: {0}")]
    InvalidTenantClaim(String),

    #[error("Invalid boolean flag: {0}")]
    InvalidFlag(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let oauth_issuer_url = vars
            .get("OAUTH_ISSUER_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("OAUTH_ISSUER_URL".to_string()))?
            .clone();

        if !oauth_issuer_url.starts_with("http://") && !oauth_issuer_url.starts_with("https://") {
            return Err(ConfigError::InvalidIssuerUrl(format!(
                "OAUTH_ISSUER_URL must start with http:// or https://, got '{oauth_issuer_url}'"
            )));
        }

        let oauth_audience = vars
            .get("OAUTH_AUDIENCE")
            .ok_or_else(|| ConfigError::MissingEnvVar("OAUTH_AUDIENCE".to_string()))?
            .clone();

        if oauth_audience.is_empty() {
            return Err(ConfigError::MissingEnvVar("OAUTH_AUDIENCE".to_string()));
        }

        let allowed_algorithms = parse_algorithms(
            vars.get("OAUTH_ALGORITHMS")
                .map_or(DEFAULT_ALLOWED_ALGORITHMS, String::as_str),
        )?;

        // JWKS endpoint defaults to the issuer's well-known location
        let jwks_url = match vars.get("OAUTH_JWKS_URL") {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!(
                "{}/.well-known/jwks.json",
                oauth_issuer_url.trim_end_matches('/')
            ),
        };

        let jwks_cache_ttl_seconds = parse_positive_u64(
            vars,
            "JWKS_CACHE_TTL",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
            ConfigError::InvalidJwks,
        )?;

        let jwks_http_timeout_seconds = parse_positive_u64(
            vars,
            "JWKS_HTTP_TIMEOUT",
            DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS,
            ConfigError::InvalidJwks,
        )?;

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?;

            if value < 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not be negative, got {value}"
                )));
            }

            #[allow(clippy::cast_possible_wrap)]
            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            #[allow(clippy::cast_possible_wrap)]
            {
                DEFAULT_CLOCK_SKEW.as_secs() as i64
            }
        };

        let redis_url = vars
            .get("REDIS_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?
            .clone();

        let rate_limit_enabled = parse_flag(vars, "RATE_LIMIT_ENABLED", true)?;

        let rate_limit_requests_per_minute = parse_positive_u32(
            vars,
            "RATE_LIMIT_REQUESTS_PER_MINUTE",
            DEFAULT_RATE_LIMIT_RPM,
        )?;

        let rate_limit_failed_auth_per_minute = parse_positive_u32(
            vars,
            "RATE_LIMIT_FAILED_AUTH_PER_MINUTE",
            DEFAULT_RATE_LIMIT_FAILED_AUTH_RPM,
        )?;

        // The failed-auth track only tightens the general one
        if rate_limit_failed_auth_per_minute >= rate_limit_requests_per_minute {
            return Err(ConfigError::InvalidRateLimit(format!(
                "RATE_LIMIT_FAILED_AUTH_PER_MINUTE ({rate_limit_failed_auth_per_minute}) must be \
                 less than RATE_LIMIT_REQUESTS_PER_MINUTE ({rate_limit_requests_per_minute})"
            )));
        }

        let rate_limit_window_seconds = parse_positive_u64(
            vars,
            "RATE_LIMIT_WINDOW_SECONDS",
            DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            ConfigError::InvalidRateLimit,
        )?;

        let tenant_claim_name = vars
            .get("TENANT_CLAIM_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TENANT_CLAIM_NAME.to_string());

        if tenant_claim_name.is_empty() {
            return Err(ConfigError::InvalidTenantClaim(
                "TENANT_CLAIM_NAME must not be empty".to_string(),
            ));
        }

        let require_tenant_claim = parse_flag(vars, "REQUIRE_TENANT_CLAIM", true)?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        Ok(Config {
            oauth_issuer_url,
            oauth_audience,
            allowed_algorithms,
            jwks_url,
            jwks_cache_ttl_seconds,
            jwks_http_timeout_seconds,
            jwt_clock_skew_seconds,
            redis_url: SecretString::from(redis_url),
            rate_limit_enabled,
            rate_limit_requests_per_minute,
            rate_limit_failed_auth_per_minute,
            rate_limit_window_seconds,
            tenant_claim_name,
            require_tenant_claim,
            bind_address,
        })
    }

    /// Clock skew as a `Duration`.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        // Validated to 0..=600 at load time
        #[allow(clippy::cast_sign_loss)]
        Duration::from_secs(self.jwt_clock_skew_seconds as u64)
    }
}

/// Parse and validate the signature algorithm allow-list.
fn parse_algorithms(raw: &str) -> Result<Vec<String>, ConfigError> {
    let algorithms: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "OAUTH_ALGORITHMS must name at least one algorithm".to_string(),
        ));
    }

    for alg in &algorithms {
        // Refuse the HMAC family before the general parse so the message names
        // the actual problem rather than a generic parse failure.
        if is_hmac_algorithm(alg) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "symmetric algorithm '{alg}' is not allowed; tokens are verified against \
                 published public keys (use the RS/ES/PS/EdDSA families)"
            )));
        }

        if alg.parse::<Algorithm>().is_err() {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "'{alg}' is not a recognized JWT signature algorithm"
            )));
        }
    }

    Ok(algorithms)
}

fn parse_positive_u64(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
    make_err: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        make_err(format!(
            "{key} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(make_err(format!("{key} must be greater than 0")));
    }

    Ok(value)
}

fn parse_positive_u32(
    vars: &HashMap<String, String>,
    key: &str,
    default: u32,
) -> Result<u32, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: u32 = value_str.parse().map_err(|e| {
        ConfigError::InvalidRateLimit(format!(
            "{key} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidRateLimit(format!(
            "{key} must be greater than 0"
        )));
    }

    Ok(value)
}

fn parse_flag(
    vars: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    value_str.parse::<bool>().map_err(|_| {
        ConfigError::InvalidFlag(format!(
            "{key} must be 'true' or 'false', got '{value_str}'"
        ))
    })
}
