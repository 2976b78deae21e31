//! JWKS client for fetching and caching the OAuth provider's public keys.
//!
//! The JWKS (JSON Web Key Set) client fetches public keys from the
//! provider's `/.well-known/jwks.json` endpoint and caches them with a
//! configurable TTL.
//!
//! # Security
//!
//! - Keys are cached to reduce load on the provider and improve latency
//! - Cache entries are keyed by issuer, so a rotation for one issuer never
//!   evicts another's keys
//! - A `force_refresh` lookup bypasses the cache so an unknown `kid` can be
//!   retried once against fresh keys before being rejected
//! - HTTPS should be used in production (enforced by deployment config)

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::config::Config;
use crate::errors::AgError;
use crate::observability::metrics::record_jwks_request;

/// JSON Web Key from the JWKS endpoint.
///
/// Covers the three key families the gateway accepts: RSA (`n`/`e`),
/// elliptic curve (`crv`/`x`/`y`) and Ed25519 (`crv`/`x`).
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA", "EC" or "OKP".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Algorithm the provider intends this key for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// X coordinate (EC) or public key value (OKP), base64url encoded.
    #[serde(default)]
    pub x: Option<String>,

    /// Y coordinate for EC keys (base64url encoded).
    #[serde(default)]
    pub y: Option<String>,
}

impl Jwk {
    /// Build a verification key from the published components.
    ///
    /// # Errors
    ///
    /// Returns `AgError::InvalidToken` with the generic validation message
    /// when the key material is incomplete or unparseable. The specific
    /// reason stays in the server logs.
    pub fn decoding_key(&self) -> Result<DecodingKey, AgError> {
        match self.kty.as_str() {
            "RSA" => {
                let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
                    tracing::warn!(
                        target: "ag.auth.jwks",
                        kid = %self.kid,
                        "RSA key is missing modulus or exponent"
                    );
                    return Err(AgError::invalid("JWT validation failed"));
                };
                DecodingKey::from_rsa_components(n, e).map_err(|e| {
                    tracing::warn!(
                        target: "ag.auth.jwks",
                        kid = %self.kid,
                        error = %e,
                        "Failed to build RSA verification key"
                    );
                    AgError::invalid("JWT validation failed")
                })
            }
            "EC" => {
                let (Some(x), Some(y)) = (self.x.as_deref(), self.y.as_deref()) else {
                    tracing::warn!(
                        target: "ag.auth.jwks",
                        kid = %self.kid,
                        "EC key is missing a coordinate"
                    );
                    return Err(AgError::invalid("JWT validation failed"));
                };
                DecodingKey::from_ec_components(x, y).map_err(|e| {
                    tracing::warn!(
                        target: "ag.auth.jwks",
                        kid = %self.kid,
                        error = %e,
                        "Failed to build EC verification key"
                    );
                    AgError::invalid("JWT validation failed")
                })
            }
            "OKP" => {
                let Some(x) = self.x.as_deref() else {
                    tracing::warn!(
                        target: "ag.auth.jwks",
                        kid = %self.kid,
                        "OKP key is missing the public key value"
                    );
                    return Err(AgError::invalid("JWT validation failed"));
                };
                let raw = common::jwt::decode_ed25519_public_key_jwk(x).map_err(|e| {
                    tracing::warn!(
                        target: "ag.auth.jwks",
                        kid = %self.kid,
                        error = %e,
                        "Failed to decode Ed25519 public key"
                    );
                    AgError::invalid("JWT validation failed")
                })?;
                Ok(DecodingKey::from_ed_der(&raw))
            }
            other => {
                tracing::warn!(
                    target: "ag.auth.jwks",
                    kid = %self.kid,
                    kty = %other,
                    "Unsupported key type in JWKS"
                );
                Err(AgError::invalid("JWT validation failed"))
            }
        }
    }
}

/// JWKS response from the OAuth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Cached key set with expiry time.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this cache entry expires.
    expires_at: Instant,
}

/// JWKS client for fetching and caching public keys.
///
/// Thread-safe client that fetches the key set over HTTPS and caches it
/// per issuer with a configurable TTL.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached key sets, keyed by issuer.
    cache: Arc<RwLock<HashMap<String, CachedJwks>>>,

    /// Cache TTL duration.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a client from gateway configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_settings(
            config.jwks_url.clone(),
            Duration::from_secs(config.jwks_cache_ttl_seconds),
            Duration::from_secs(config.jwks_http_timeout_seconds),
        )
    }

    /// Create a client with explicit cache TTL and HTTP timeout.
    #[must_use]
    pub fn with_settings(jwks_url: String, cache_ttl: Duration, http_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "ag.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    /// Get a signing key by issuer and key ID.
    ///
    /// Serves from the cache when a fresh entry exists. With
    /// `force_refresh` the cache is bypassed and the key set is fetched
    /// again; callers use this to retry an unknown `kid` once before
    /// rejecting the token.
    ///
    /// Returns `Ok(None)` when the key set was fetched successfully but
    /// does not contain `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AgError::ServiceUnavailable` if the key set cannot be
    /// fetched or parsed.
    #[instrument(skip(self), fields(issuer = %issuer, kid = %kid))]
    pub async fn get_signing_key(
        &self,
        issuer: &str,
        kid: &str,
        force_refresh: bool,
    ) -> Result<Option<Jwk>, AgError> {
        if !force_refresh {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(issuer) {
                if cached.expires_at > Instant::now() {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "ag.auth.jwks", kid = %kid, "JWKS cache hit");
                        record_jwks_request("hit");
                        return Ok(Some(key.clone()));
                    }
                    tracing::debug!(target: "ag.auth.jwks", kid = %kid, "Key not found in JWKS cache");
                    record_jwks_request("miss");
                    return Ok(None);
                }
            }
        }

        // Cache miss, expired entry, or forced refresh
        self.refresh_cache(issuer).await?;

        let cache = self.cache.read().await;
        let key = cache
            .get(issuer)
            .and_then(|cached| cached.keys.get(kid).cloned());

        if key.is_none() {
            tracing::warn!(target: "ag.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        }

        Ok(key)
    }

    /// Refresh the cached key set for an issuer.
    #[instrument(skip(self), fields(issuer = %issuer))]
    async fn refresh_cache(&self, issuer: &str) -> Result<(), AgError> {
        tracing::debug!(target: "ag.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "ag.auth.jwks", error = %e, "Failed to fetch JWKS");
                record_jwks_request("error");
                AgError::unavailable("Unable to fetch signing keys from OAuth provider")
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "ag.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            record_jwks_request("error");
            return Err(AgError::unavailable(
                "Unable to fetch signing keys from OAuth provider",
            ));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "ag.auth.jwks", error = %e, "Failed to parse JWKS response");
            record_jwks_request("error");
            AgError::unavailable("Unable to fetch signing keys from OAuth provider")
        })?;

        // Build key map
        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "ag.auth.jwks",
            issuer = %issuer,
            key_count = keys.len(),
            "JWKS cache refreshed"
        );
        record_jwks_request("refresh");

        let mut cache = self.cache.write().await;
        cache.insert(
            issuer.to_string(),
            CachedJwks {
                keys,
                expires_at: Instant::now() + self.cache_ttl,
            },
        );

        Ok(())
    }

    /// Clear the cache.
    ///
    /// Useful for testing.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // 32 bytes of 0x01, base64url without padding
    const DUMMY_COORD: &str = "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE";

    #[test]
    fn test_rsa_jwk_deserialization() {
        let json = r#"{
            "kty": "RSA",
            "kid": "rsa-key-01",
            "alg": "RS256",
            "use": "sig",
            "n": "c29tZS1tb2R1bHVz",
            "e": "AQAB"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid, "rsa-key-01");
        assert_eq!(jwk.alg, Some("RS256".to_string()));
        assert_eq!(jwk.key_use, Some("sig".to_string()));
        assert_eq!(jwk.n, Some("c29tZS1tb2R1bHVz".to_string()));
        assert_eq!(jwk.e, Some("AQAB".to_string()));
    }

    #[test]
    fn test_okp_jwk_deserialization() {
        let json = r#"{
            "kty": "OKP",
            "kid": "ed-key-01",
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "alg": "EdDSA",
            "use": "sig"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.crv, Some("Ed25519".to_string()));
        assert!(jwk.n.is_none());
        assert!(jwk.y.is_none());
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        let json = r#"{
            "kty": "RSA",
            "kid": "key-02"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kid, "key-02");
        assert!(jwk.alg.is_none());
        assert!(jwk.n.is_none());
        assert!(jwk.x.is_none());
    }

    #[test]
    fn test_jwks_response_deserialization() {
        let json = r#"{
            "keys": [
                {"kty": "RSA", "kid": "key-1"},
                {"kty": "OKP", "kid": "key-2"}
            ]
        }"#;

        let jwks: JwksResponse = serde_json::from_str(json).unwrap();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys.first().unwrap().kid, "key-1");
        assert_eq!(jwks.keys.get(1).unwrap().kid, "key-2");
    }

    #[test]
    fn test_rsa_decoding_key_from_components() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: "rsa-key".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some("c29tZS1tb2R1bHVz".to_string()),
            e: Some("AQAB".to_string()),
            crv: None,
            x: None,
            y: None,
        };

        assert!(jwk.decoding_key().is_ok());
    }

    #[test]
    fn test_rsa_decoding_key_missing_components() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: "rsa-key".to_string(),
            alg: None,
            key_use: None,
            n: None,
            e: Some("AQAB".to_string()),
            crv: None,
            x: None,
            y: None,
        };

        let result = jwk.decoding_key();
        assert!(matches!(result, Err(AgError::InvalidToken(_))));
    }

    #[test]
    fn test_ec_decoding_key_from_components() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            kid: "ec-key".to_string(),
            alg: Some("ES256".to_string()),
            key_use: Some("sig".to_string()),
            n: None,
            e: None,
            crv: Some("P-256".to_string()),
            x: Some(DUMMY_COORD.to_string()),
            y: Some(DUMMY_COORD.to_string()),
        };

        assert!(jwk.decoding_key().is_ok());
    }

    #[test]
    fn test_okp_decoding_key_from_rfc8037_vector() {
        let jwk = Jwk {
            kty: "OKP".to_string(),
            kid: "ed-key".to_string(),
            alg: Some("EdDSA".to_string()),
            key_use: Some("sig".to_string()),
            n: None,
            e: None,
            crv: Some("Ed25519".to_string()),
            x: Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".to_string()),
            y: None,
        };

        assert!(jwk.decoding_key().is_ok());
    }

    #[test]
    fn test_unknown_key_type_is_rejected() {
        let jwk = Jwk {
            kty: "oct".to_string(),
            kid: "sym-key".to_string(),
            alg: Some("HS256".to_string()),
            key_use: None,
            n: None,
            e: None,
            crv: None,
            x: None,
            y: None,
        };

        let result = jwk.decoding_key();
        assert!(matches!(result, Err(AgError::InvalidToken(_))));
    }

    #[test]
    fn test_jwks_client_creation() {
        let client = JwksClient::with_settings(
            "http://localhost:8082/.well-known/jwks.json".to_string(),
            Duration::from_secs(300),
            Duration::from_secs(10),
        );
        assert_eq!(
            client.jwks_url,
            "http://localhost:8082/.well-known/jwks.json"
        );
        assert_eq!(client.cache_ttl, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_clear_cache_is_idempotent() {
        let client = JwksClient::with_settings(
            "http://localhost:8082/.well-known/jwks.json".to_string(),
            Duration::from_secs(300),
            Duration::from_secs(10),
        );
        client.clear_cache().await;
        client.clear_cache().await;
    }
}
