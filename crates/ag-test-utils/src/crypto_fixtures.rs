//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs for signing test tokens and
//! publishing matching JWKS documents. All fixtures are deterministic
//! based on seed values, so tests never depend on an OS RNG.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};

/// Deterministic Ed25519 keypair for signing test JWTs.
///
/// The same seed always produces the same keypair, ensuring test
/// reproducibility. The public half can be rendered as a JWK for
/// serving from a mock provider.
pub struct TestKeypair {
    kid: String,
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl TestKeypair {
    /// Generate a keypair from a seed with a derived key ID.
    ///
    /// # Panics
    ///
    /// Panics if ring rejects the seed, which cannot happen for a
    /// 32-byte input.
    #[must_use]
    pub fn generate(seed: u8) -> Self {
        Self::with_kid(seed, &format!("test-key-{seed}"))
    }

    /// Generate a keypair from a seed with an explicit key ID.
    #[must_use]
    pub fn with_kid(seed: u8, kid: &str) -> Self {
        // Create deterministic 32-byte seed from input
        let mut seed_bytes = [0u8; 32];
        seed_bytes[0] = seed;
        for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
            *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
        }

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("32-byte seed is always accepted");

        Self {
            kid: kid.to_string(),
            pkcs8: build_pkcs8_from_seed(&seed_bytes),
            public_key: key_pair.public_key().as_ref().to_vec(),
        }
    }

    /// The key ID published in the JWKS and stamped into token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign a claim set as an EdDSA JWT with this key's `kid`.
    #[must_use]
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_kid(claims, &self.kid)
    }

    /// Sign a claim set stamping an arbitrary `kid` into the header.
    ///
    /// Useful for forging tokens that reference a key the JWKS does not
    /// serve.
    #[must_use]
    pub fn sign_with_kid(&self, claims: &Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(kid.to_string());

        let key = EncodingKey::from_ed_der(&self.pkcs8);
        jsonwebtoken::encode(&header, claims, &key).expect("test token signing never fails")
    }

    /// Render the public half as a JWK object.
    #[must_use]
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": self.kid,
            "x": URL_SAFE_NO_PAD.encode(&self.public_key),
            "alg": "EdDSA",
            "use": "sig",
        })
    }
}

/// Render a full JWKS document from a set of keypairs.
#[must_use]
pub fn jwks_document(keys: &[&TestKeypair]) -> Value {
    json!({
        "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>(),
    })
}

/// Craft an HS256 token signed with an attacker-chosen secret.
///
/// Gateways that accept symmetric algorithms can be forged against
/// with their own published JWKS material, so these must be rejected
/// before any signature check.
#[must_use]
pub fn hs256_attack_token(claims: &Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());

    let key = EncodingKey::from_secret(b"attacker-controlled-secret");
    jsonwebtoken::encode(&header, claims, &key).expect("test token signing never fails")
}

/// Craft an unsigned `alg=none` token.
///
/// jsonwebtoken refuses to produce these, so the segments are
/// assembled by hand: base64url header and claims with an empty
/// signature segment.
#[must_use]
pub fn alg_none_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// Ring doesn't expose a method to get PKCS#8 from an existing
/// `Ed25519KeyPair`, so the document is assembled by hand (RFC 5208):
/// SEQUENCE { version INTEGER (0), algorithm AlgorithmIdentifier,
/// privateKey OCTET STRING }.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::new();

    // Outer SEQUENCE tag
    pkcs8.push(0x30);
    pkcs8.push(0x2e); // Length: 46 bytes

    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);

    // Algorithm Identifier: SEQUENCE
    pkcs8.push(0x30);
    pkcs8.push(0x05); // Length: 5 bytes
                      // OID for Ed25519: 1.3.101.112
    pkcs8.extend_from_slice(&[0x06, 0x03, 0x2b, 0x65, 0x70]);

    // Private Key: OCTET STRING
    pkcs8.push(0x04);
    pkcs8.push(0x22); // Length: 34 bytes
                      // Inner OCTET STRING with seed
    pkcs8.push(0x04);
    pkcs8.push(0x20); // Length: 32 bytes
    pkcs8.extend_from_slice(seed);

    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_is_deterministic() {
        let a = TestKeypair::generate(1);
        let b = TestKeypair::generate(1);

        assert_eq!(a.public_key, b.public_key, "same seed, same public key");
        assert_eq!(a.pkcs8, b.pkcs8, "same seed, same private key");
        assert_eq!(a.kid(), "test-key-1");
    }

    #[test]
    fn test_different_seeds_produce_different_keys() {
        let a = TestKeypair::generate(1);
        let b = TestKeypair::generate(2);

        assert_ne!(a.public_key, b.public_key);
    }

    #[test]
    fn test_jwk_shape() {
        let key = TestKeypair::with_kid(3, "rotation-key");
        let jwk = key.jwk_json();

        assert_eq!(jwk["kty"], "OKP");
        assert_eq!(jwk["crv"], "Ed25519");
        assert_eq!(jwk["kid"], "rotation-key");
        assert_eq!(jwk["alg"], "EdDSA");
        assert_eq!(jwk["use"], "sig");

        // 32 bytes of Ed25519 public key is 43 base64url chars unpadded
        let x = jwk["x"].as_str().unwrap();
        assert_eq!(x.len(), 43);
        assert!(!x.contains('='));
    }

    #[test]
    fn test_jwks_document_lists_all_keys() {
        let a = TestKeypair::generate(1);
        let b = TestKeypair::generate(2);
        let doc = jwks_document(&[&a, &b]);

        let keys = doc["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0]["kid"], "test-key-1");
        assert_eq!(keys[1]["kid"], "test-key-2");
    }

    #[test]
    fn test_signed_token_has_three_segments_and_kid() {
        let key = TestKeypair::generate(1);
        let token = key.sign(&serde_json::json!({"sub": "alice", "exp": 2_000_000_000}));

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::EdDSA);
        assert_eq!(header.kid.as_deref(), Some("test-key-1"));
    }

    #[test]
    fn test_signature_verifies_against_public_key() {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let key = TestKeypair::generate(7);
        let token = key.sign(&serde_json::json!({
            "sub": "alice",
            "exp": 2_000_000_000_i64,
        }));

        let decoding_key = DecodingKey::from_ed_der(&key.public_key);
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.required_spec_claims.clear();

        let decoded = decode::<serde_json::Value>(&token, &decoding_key, &validation).unwrap();
        assert_eq!(decoded.claims["sub"], "alice");
    }

    #[test]
    fn test_alg_none_token_shape() {
        let token = alg_none_token(&serde_json::json!({"sub": "mallory"}));

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[2].is_empty(), "no signature segment");

        let header = jsonwebtoken::decode_header(&token);
        assert!(header.is_err(), "jsonwebtoken refuses alg=none headers");
    }

    #[test]
    fn test_hs256_attack_token_parses() {
        let token = hs256_attack_token(&serde_json::json!({"sub": "mallory"}), "test-key-1");
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }
}
