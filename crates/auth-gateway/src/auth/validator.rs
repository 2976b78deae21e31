//! The token validation pipeline.
//!
//! Validation runs as a fixed sequence of checks, each depending on the
//! previous one succeeding:
//!
//! 1. Parse the JWT header (size and structure checks, no crypto)
//! 2. Approve the algorithm: must be in the configured allow-list, and the
//!    HMAC family is refused outright before any key material is touched
//! 3. Resolve the signing key by `kid`, retrying once with a forced JWKS
//!    refresh to pick up key rotations
//! 4. Verify signature, expiry, issuer and audience, then the issued-at
//!    bound, and deserialize the claim schema
//! 5. Check the revocation store (fail-closed on store errors)
//! 6. Normalize the tenant claim to a canonical lowercase UUID
//! 7. Assemble the scope set and produce the authenticated identity
//!
//! The HMAC refusal in step 2 exists because a symmetric `alg` would make
//! the *public* JWKS material the verification secret: an attacker who can
//! read the published keys could mint tokens that verify. No HS-prefixed
//! algorithm reaches the signature check under any configuration.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::claims::{AuthenticatedUser, TokenClaims};
use crate::auth::jwks::JwksClient;
use crate::config::Config;
use crate::errors::AgError;
use crate::revocation::RevocationStore;

/// Validates bearer tokens against the configured OAuth issuer.
#[derive(Clone)]
pub struct TokenValidator {
    config: Arc<Config>,
    jwks: Arc<JwksClient>,
    revocation: Arc<dyn RevocationStore>,
}

impl TokenValidator {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        jwks: Arc<JwksClient>,
        revocation: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            config,
            jwks,
            revocation,
        }
    }

    /// Validate a bearer token and produce the authenticated identity.
    ///
    /// # Errors
    ///
    /// - `AgError::InvalidToken` for every structural, cryptographic or
    ///   claim failure, with a client-safe description
    /// - `AgError::ExpiredToken` when the token is past its expiry
    /// - `AgError::ServiceUnavailable` when the JWKS endpoint or the
    ///   revocation store cannot be reached
    #[instrument(skip_all, name = "auth.validate")]
    pub async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AgError> {
        // Step 1: header inspection, no crypto yet
        let header = common::jwt::decode_header(token)
            .map_err(|_| AgError::invalid("Malformed JWT token"))?;

        // Step 2: algorithm approval
        let Some(alg) = header.alg() else {
            return Err(AgError::invalid("Unsupported JWT algorithm"));
        };
        if !self.config.allowed_algorithms.iter().any(|a| a == alg) {
            tracing::debug!(target: "ag.auth", alg = %alg, "Token algorithm not in allow-list");
            return Err(AgError::invalid("Unsupported JWT algorithm"));
        }
        // Guard against misconfiguration: even an allow-listed HMAC
        // algorithm must never reach signature verification
        if common::jwt::is_hmac_algorithm(alg) {
            tracing::warn!(target: "ag.auth", alg = %alg, "Refusing symmetric algorithm");
            return Err(AgError::invalid("Only asymmetric algorithms supported"));
        }

        let Some(kid) = header.kid() else {
            return Err(AgError::invalid("JWT header missing 'kid' (key ID) claim"));
        };

        // Step 3: key resolution, with one forced refresh for rotations
        let issuer = &self.config.oauth_issuer_url;
        let jwk = match self.jwks.get_signing_key(issuer, kid, false).await? {
            Some(key) => key,
            None => {
                tracing::debug!(
                    target: "ag.auth",
                    kid = %kid,
                    "Key not cached, retrying with forced JWKS refresh"
                );
                match self.jwks.get_signing_key(issuer, kid, true).await? {
                    Some(key) => key,
                    None => return Err(AgError::invalid("Signing key not found in JWKS")),
                }
            }
        };

        // The provider publishes the algorithm each key is meant for; a
        // token claiming a different one is not verified against it
        if let Some(key_alg) = &jwk.alg {
            if key_alg != alg {
                tracing::warn!(
                    target: "ag.auth",
                    kid = %kid,
                    token_alg = %alg,
                    key_alg = %key_alg,
                    "Token algorithm does not match the published key"
                );
                return Err(AgError::invalid("JWT validation failed"));
            }
        }

        let decoding_key = jwk.decoding_key()?;

        // Step 4: signature and registered claims
        let algorithm = alg
            .parse::<Algorithm>()
            .map_err(|_| AgError::invalid("Unsupported JWT algorithm"))?;
        let mut validation = Validation::new(algorithm);
        validation.leeway = self.config.clock_skew().as_secs();
        validation.validate_exp = true;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[&self.config.oauth_audience]);

        let token_data =
            decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AgError::ExpiredToken,
                    ErrorKind::InvalidSignature => {
                        AgError::invalid("JWT signature validation failed")
                    }
                    kind => {
                        tracing::debug!(
                            target: "ag.auth",
                            error_kind = ?kind,
                            "Claim verification failed"
                        );
                        AgError::invalid("JWT validation failed")
                    }
                }
            })?;
        let claims = token_data.claims;

        // Tokens from the future are as suspect as expired ones
        common::jwt::validate_iat(claims.iat, self.config.clock_skew())
            .map_err(|_| AgError::invalid("JWT validation failed"))?;

        // Step 5: revocation, fail-closed on store errors
        if self.revocation.is_token_revoked(&claims.jti).await? {
            tracing::info!(target: "ag.auth", jti = %claims.jti, "Rejected revoked token");
            return Err(AgError::invalid("Token has been revoked"));
        }

        // Step 6: tenant normalization
        let tenant_id = self.normalize_tenant(&claims)?;

        // Step 7: scope assembly
        let scopes = claims.assemble_scopes();

        tracing::debug!(
            target: "ag.auth",
            jti = %claims.jti,
            tenant_id = ?tenant_id,
            scope_count = scopes.len(),
            "Token validated"
        );

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            tenant_id,
            jti: claims.jti,
            exp: claims.exp,
            email: claims.email,
            name: claims.name,
            scopes,
            issuer: claims.iss,
        })
    }

    /// Resolve and canonicalize the tenant claim.
    ///
    /// Any syntactically valid UUID form is accepted and rendered as the
    /// canonical lowercase hyphenated string, so the same tenant never
    /// appears under two spellings downstream.
    fn normalize_tenant(&self, claims: &TokenClaims) -> Result<Option<String>, AgError> {
        let claim_name = &self.config.tenant_claim_name;

        match claims.tenant_claim(claim_name) {
            Some(raw) => {
                let uuid = Uuid::parse_str(raw).map_err(|_| {
                    tracing::debug!(
                        target: "ag.auth",
                        claim = %claim_name,
                        "Tenant claim is not a valid UUID"
                    );
                    AgError::invalid(format!("Invalid {claim_name} format"))
                })?;
                Ok(Some(uuid.to_string()))
            }
            None if self.config.require_tenant_claim => Err(AgError::invalid(format!(
                "JWT missing required '{claim_name}' claim"
            ))),
            None => Ok(None),
        }
    }
}
