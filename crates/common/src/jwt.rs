//! JWT utilities shared across Gatehouse components.
//!
//! This module provides the primitives the token validation pipeline builds on:
//! - Size limits for DoS prevention
//! - Unverified header inspection (`alg`/`kid` extraction for key lookup)
//! - HMAC-family algorithm detection (key-confusion defense)
//! - Clock skew constants and `iat` validation
//! - JWK public key decoding helpers
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header inspection never verifies a signature; callers MUST verify the
//!   token against a trusted key after resolving it
//! - Error messages here are internal; the service maps them to generic
//!   client-facing descriptions

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// This limit prevents denial-of-service via oversized tokens. JWTs larger
/// than this are rejected BEFORE any base64 decode or cryptographic work.
/// Typical access tokens are 200-1500 bytes; 8KB leaves generous headroom
/// for large claim sets while bounding allocation per request.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Accounts for clock drift between the issuer and this service. Tokens with
/// `iat` (issued-at) timestamps more than this amount in the future are
/// rejected; the same tolerance is applied as leeway when checking `exp`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration that would weaken expiry enforcement by
/// accepting an excessively large skew.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Prefix shared by all HMAC-family JWS algorithm names (HS256/HS384/HS512).
const HMAC_ALG_PREFIX: &str = "HS";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
///
/// These carry no token material. The service layer translates them into
/// generic client-facing messages; details are logged at debug level only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Token size exceeds `MAX_JWT_SIZE_BYTES`.
    #[error("token exceeds maximum allowed size")]
    TokenTooLarge,

    /// Token is not structurally a JWT (wrong part count, bad base64, bad JSON).
    #[error("token structure is not a valid JWT")]
    MalformedToken,

    /// Token `iat` claim is further in the future than the allowed skew.
    #[error("token issued-at is too far in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Header Inspection
// =============================================================================

/// The unverified JOSE header fields the validation pipeline needs.
///
/// Non-string `alg`/`kid` values are treated as absent rather than failing
/// the whole decode, so the caller can produce a precise rejection reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    alg: Option<String>,
    kid: Option<String>,
}

impl TokenHeader {
    /// The `alg` header value, if present and a non-empty string.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    /// The `kid` header value, if present and a non-empty string.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

/// Decode a JWT header without verifying the signature.
///
/// Used to learn which algorithm the token claims and which key to resolve
/// from the issuer's JWKS. The token MUST still be verified against the
/// resolved key afterwards.
///
/// Token size is checked before any decoding (DoS prevention).
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - not three dot-separated parts, header part is not
///   valid base64url, or the decoded header is not a JSON object
pub fn decode_header(token: &str) -> Result<TokenHeader, JwtError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtError::MalformedToken
    })?;

    if !header.is_object() {
        tracing::debug!(target: "common.jwt", "Token rejected: header is not a JSON object");
        return Err(JwtError::MalformedToken);
    }

    // Non-string or empty values are normalized to None so the validator can
    // report "missing" rather than choking on adversarial header shapes.
    let field = |name: &str| -> Option<String> {
        header
            .get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };

    Ok(TokenHeader {
        alg: field("alg"),
        kid: field("kid"),
    })
}

/// Whether an algorithm name belongs to the symmetric HMAC family.
///
/// HMAC algorithms must never be accepted by a service that verifies with
/// published public keys: an attacker who signs with the public key as the
/// HMAC secret would otherwise pass verification (the classic RS256->HS256
/// confusion attack). The check is on the name prefix so it also covers
/// HS384/HS512 and any future HS variant.
#[must_use]
pub fn is_hmac_algorithm(alg: &str) -> bool {
    alg.starts_with(HMAC_ALG_PREFIX)
}

// =============================================================================
// Claim Validation Helpers
// =============================================================================

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens with `iat` too far in the future, which could indicate a
/// pre-generated token, clock desynchronization, or claim manipulation.
///
/// # Errors
///
/// Returns `JwtError::IatTooFarInFuture` if `iat` is more than `clock_skew`
/// ahead of the current time.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// Prefer [`validate_iat`] in production code. This variant exists so that
/// boundary conditions can be unit-tested without wall-clock dependence.
pub(crate) fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds), well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Key Decoding
// =============================================================================

/// Decode an Ed25519 public key from a JWK `x` field (base64url format).
///
/// The `x` field of an OKP (Octet Key Pair) JWK contains the raw public key
/// in unpadded base64url. The returned bytes feed
/// `jsonwebtoken::DecodingKey::from_ed_der`.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content is not valid base64url.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Constants Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_default_clock_skew_is_5_minutes() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
    }

    #[test]
    fn test_max_clock_skew_is_10_minutes() {
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // decode_header Tests
    // -------------------------------------------------------------------------

    fn token_with_header(header_json: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header_json);
        format!("{header_b64}.payload.signature")
    }

    #[test]
    fn test_decode_header_complete() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"test-key-01"}"#);

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg(), Some("RS256"));
        assert_eq!(header.kid(), Some("test-key-01"));
    }

    #[test]
    fn test_decode_header_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg(), Some("RS256"));
        assert_eq!(header.kid(), None);
    }

    #[test]
    fn test_decode_header_missing_alg() {
        let token = token_with_header(r#"{"typ":"JWT","kid":"key-1"}"#);

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg(), None);
        assert_eq!(header.kid(), Some("key-1"));
    }

    #[test]
    fn test_decode_header_non_string_fields_treated_as_absent() {
        // Adversarial header shapes must not crash the decoder
        let token = token_with_header(r#"{"alg":12345,"kid":null}"#);

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg(), None);
        assert_eq!(header.kid(), None);
    }

    #[test]
    fn test_decode_header_empty_strings_treated_as_absent() {
        let token = token_with_header(r#"{"alg":"","kid":""}"#);

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg(), None);
        assert_eq!(header.kid(), None);
    }

    #[test]
    fn test_decode_header_malformed_token() {
        let result = decode_header("not-a-jwt");
        assert!(matches!(result, Err(JwtError::MalformedToken)));
    }

    #[test]
    fn test_decode_header_empty_token() {
        let result = decode_header("");
        assert!(matches!(result, Err(JwtError::MalformedToken)));
    }

    #[test]
    fn test_decode_header_too_many_parts() {
        let result = decode_header("a.b.c.d");
        assert!(matches!(result, Err(JwtError::MalformedToken)));
    }

    #[test]
    fn test_decode_header_invalid_base64() {
        let result = decode_header("!!!invalid!!!.payload.signature");
        assert!(matches!(result, Err(JwtError::MalformedToken)));
    }

    #[test]
    fn test_decode_header_invalid_json() {
        let header_b64 = URL_SAFE_NO_PAD.encode("not-json");
        let token = format!("{header_b64}.payload.signature");

        let result = decode_header(&token);
        assert!(matches!(result, Err(JwtError::MalformedToken)));
    }

    #[test]
    fn test_decode_header_json_array_rejected() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"["alg","RS256"]"#);
        let token = format!("{header_b64}.payload.signature");

        let result = decode_header(&token);
        assert!(matches!(result, Err(JwtError::MalformedToken)));
    }

    #[test]
    fn test_decode_header_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        let result = decode_header(&oversized);
        assert!(matches!(result, Err(JwtError::TokenTooLarge)));
    }

    #[test]
    fn test_decode_header_at_size_limit() {
        let header = r#"{"alg":"RS256","typ":"JWT","kid":"key"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        // Need 3 parts: header.payload.signature (2 dots)
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2;
        let payload_len = remaining / 2;
        let sig_len = remaining - payload_len;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(sig_len)
        );

        assert_eq!(
            token.len(),
            MAX_JWT_SIZE_BYTES,
            "Token should be exactly at size limit"
        );

        let result = decode_header(&token);
        assert!(result.is_ok(), "Token at size limit should be accepted");
        assert_eq!(result.unwrap().kid(), Some("key"));
    }

    // -------------------------------------------------------------------------
    // is_hmac_algorithm Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_hmac_family_detected() {
        assert!(is_hmac_algorithm("HS256"));
        assert!(is_hmac_algorithm("HS384"));
        assert!(is_hmac_algorithm("HS512"));
        // Hypothetical future variants still match on prefix
        assert!(is_hmac_algorithm("HS1024"));
    }

    #[test]
    fn test_asymmetric_algorithms_not_hmac() {
        assert!(!is_hmac_algorithm("RS256"));
        assert!(!is_hmac_algorithm("RS384"));
        assert!(!is_hmac_algorithm("ES256"));
        assert!(!is_hmac_algorithm("PS256"));
        assert!(!is_hmac_algorithm("EdDSA"));
        assert!(!is_hmac_algorithm("none"));
        assert!(!is_hmac_algorithm(""));
    }

    // -------------------------------------------------------------------------
    // validate_iat Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_current_time() {
        let now = chrono::Utc::now().timestamp();
        let result = validate_iat(now, DEFAULT_CLOCK_SKEW);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_iat_past_time() {
        let past = chrono::Utc::now().timestamp() - 3600; // 1 hour ago
        let result = validate_iat(past, DEFAULT_CLOCK_SKEW);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_iat_within_clock_skew() {
        let future = chrono::Utc::now().timestamp() + 200; // 200s in future (< 300s skew)
        let result = validate_iat(future, DEFAULT_CLOCK_SKEW);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_iat_far_future() {
        let far_future = chrono::Utc::now().timestamp() + 86400; // 1 day in future
        let result = validate_iat(far_future, DEFAULT_CLOCK_SKEW);
        assert!(matches!(result, Err(JwtError::IatTooFarInFuture)));
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000_i64;

        // iat == now + skew is the last accepted value
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());

        // iat == now + skew + 1 is the first rejected value
        assert!(matches!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtError::IatTooFarInFuture)
        ));
    }

    #[test]
    fn test_validate_iat_at_zero_skew() {
        let now = 1_700_000_000_i64;

        // With zero skew, iat == now is accepted but now + 1 is not
        assert!(validate_iat_at(now, Duration::ZERO, now).is_ok());
        assert!(matches!(
            validate_iat_at(now + 1, Duration::ZERO, now),
            Err(JwtError::IatTooFarInFuture)
        ));
    }

    // -------------------------------------------------------------------------
    // Key Decoding Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_ed25519_public_key_jwk() {
        // base64url encoded value from RFC 8037 appendix A
        let x = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";
        let result = decode_ed25519_public_key_jwk(x);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 32); // Ed25519 public key is 32 bytes
    }

    #[test]
    fn test_decode_ed25519_public_key_jwk_invalid() {
        let invalid = "not-valid-base64url!!!";
        let result = decode_ed25519_public_key_jwk(invalid);
        assert!(result.is_err());
    }
}
