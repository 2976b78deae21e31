//! Claim structures for verified tokens.
//!
//! [`TokenClaims`] is the schema the signature-verified payload must satisfy;
//! [`AuthenticatedUser`] is the identity handed to downstream handlers after
//! the full validation pipeline succeeds. Both redact personal fields in
//! Debug output so request logs never leak them.

use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Realm role container, as issued by Keycloak-style providers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Schema-validated claim set from a verified token.
///
/// Signature verification happens before deserialization into this type, so
/// a value of this type always came from a correctly signed token. The
/// mandatory fields below make deserialization itself part of validation:
/// a token missing any of them is rejected without further checks.
#[derive(Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject (user) identifier.
    pub sub: String,

    /// Issuer URL.
    pub iss: String,

    /// Audience, normalized to a list. Providers emit either a single
    /// string or an array here.
    #[serde(deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,

    /// Expiry, seconds since epoch.
    pub exp: i64,

    /// Issued-at, seconds since epoch.
    pub iat: i64,

    /// Unique token identifier, the revocation handle.
    pub jti: String,

    /// Tenant identifier, when issued under the default claim name.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Space-separated OAuth scope string.
    #[serde(default)]
    pub scope: Option<String>,

    /// Realm roles, unioned into the scope set.
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub preferred_username: Option<String>,

    /// Remaining claims, kept for configurable tenant claim names.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenClaims {
    /// Look up the tenant claim under the configured name.
    ///
    /// Returns `None` when the claim is absent or not a string.
    #[must_use]
    pub fn tenant_claim(&self, claim_name: &str) -> Option<&str> {
        if claim_name == "tenant_id" {
            self.tenant_id.as_deref()
        } else {
            self.extra.get(claim_name).and_then(serde_json::Value::as_str)
        }
    }

    /// Union of the space-separated scope string and the realm roles.
    #[must_use]
    pub fn assemble_scopes(&self) -> BTreeSet<String> {
        let mut scopes: BTreeSet<String> = self
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(ToString::to_string)
            .collect();

        if let Some(realm) = &self.realm_access {
            scopes.extend(realm.roles.iter().cloned());
        }

        scopes
    }
}

/// Custom Debug implementation that redacts personal fields.
impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("jti", &self.jti)
            .field("tenant_id", &self.tenant_id)
            .field("scope", &self.scope)
            .field("realm_access", &self.realm_access)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name.as_ref().map(|_| "[REDACTED]"))
            .field(
                "preferred_username",
                &self.preferred_username.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

/// Validated, request-scoped identity.
///
/// Created only by the validation pipeline on full success and carried in
/// request extensions for the lifetime of one request.
#[derive(Clone)]
pub struct AuthenticatedUser {
    /// Subject identifier from the token.
    pub user_id: String,

    /// Canonical lowercase UUID string, present whenever the tenant claim
    /// is required (the default).
    pub tenant_id: Option<String>,

    /// Token identifier, used for revocation.
    pub jti: String,

    /// Token expiry, seconds since epoch.
    pub exp: i64,

    pub email: Option<String>,

    pub name: Option<String>,

    /// Resolved scope set: OAuth scopes unioned with realm roles.
    pub scopes: BTreeSet<String>,

    /// Issuer that signed the token.
    pub issuer: String,
}

impl AuthenticatedUser {
    /// Whether the identity carries the given scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

/// Custom Debug implementation that redacts personal fields. The user and
/// token ids stay visible for log correlation.
impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .field("jti", &self.jti)
            .field("exp", &self.exp)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name.as_ref().map(|_| "[REDACTED]"))
            .field("scopes", &self.scopes)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Accept `aud` as either a single string or a list of strings.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct AudienceVisitor;

    impl<'de> Visitor<'de> for AudienceVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a sequence of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut values = Vec::new();
            while let Some(value) = seq.next_element::<String>()? {
                values.push(value);
            }
            Ok(values)
        }
    }

    deserializer.deserialize_any(AudienceVisitor)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::scopes;

    fn full_claims_json() -> serde_json::Value {
        serde_json::json!({
            "sub": "user-123",
            "iss": "https://auth.example.com/realms/test",
            "aud": ["gatehouse-api", "other-api"],
            "exp": 1_900_000_000,
            "iat": 1_900_000_000 - 3600,
            "jti": "token-abc",
            "tenant_id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "scope": "statements/read statements/write",
            "realm_access": {"roles": ["admin"]},
            "email": "user@example.com",
            "name": "Test User",
            "preferred_username": "tuser"
        })
    }

    #[test]
    fn test_deserialize_full_claims() {
        let claims: TokenClaims = serde_json::from_value(full_claims_json()).unwrap();

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.iss, "https://auth.example.com/realms/test");
        assert_eq!(
            claims.aud,
            vec!["gatehouse-api".to_string(), "other-api".to_string()]
        );
        assert_eq!(claims.jti, "token-abc");
        assert_eq!(
            claims.tenant_id.as_deref(),
            Some("3fa85f64-5717-4562-b3fc-2c963f66afa6")
        );
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_audience_accepts_single_string() {
        let mut json = full_claims_json();
        json["aud"] = serde_json::json!("gatehouse-api");

        let claims: TokenClaims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.aud, vec!["gatehouse-api".to_string()]);
    }

    #[test]
    fn test_mandatory_claims_enforced() {
        for field in ["sub", "iss", "aud", "exp", "iat", "jti"] {
            let mut json = full_claims_json();
            json.as_object_mut().unwrap().remove(field);

            let result: Result<TokenClaims, _> = serde_json::from_value(json);
            assert!(result.is_err(), "claims without '{field}' must not parse");
        }
    }

    #[test]
    fn test_optional_claims_default_to_none() {
        let json = serde_json::json!({
            "sub": "user-123",
            "iss": "https://auth.example.com",
            "aud": "gatehouse-api",
            "exp": 1_900_000_000,
            "iat": 1_899_996_400,
            "jti": "token-abc"
        });

        let claims: TokenClaims = serde_json::from_value(json).unwrap();

        assert!(claims.tenant_id.is_none());
        assert!(claims.scope.is_none());
        assert!(claims.realm_access.is_none());
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_assemble_scopes_unions_scope_string_and_roles() {
        let claims: TokenClaims = serde_json::from_value(full_claims_json()).unwrap();

        let assembled = claims.assemble_scopes();
        let expected: BTreeSet<String> =
            [scopes::STATEMENTS_READ, scopes::STATEMENTS_WRITE, scopes::ADMIN]
                .iter()
                .map(ToString::to_string)
                .collect();
        assert_eq!(assembled, expected);
    }

    #[test]
    fn test_assemble_scopes_deduplicates() {
        let mut json = full_claims_json();
        json["scope"] = serde_json::json!("admin statements/read");
        json["realm_access"] = serde_json::json!({"roles": ["admin"]});

        let claims: TokenClaims = serde_json::from_value(json).unwrap();
        let assembled = claims.assemble_scopes();

        assert_eq!(assembled.len(), 2);
        assert!(assembled.contains(scopes::ADMIN));
        assert!(assembled.contains(scopes::STATEMENTS_READ));
    }

    #[test]
    fn test_assemble_scopes_empty_when_no_claims() {
        let mut json = full_claims_json();
        json.as_object_mut().unwrap().remove("scope");
        json.as_object_mut().unwrap().remove("realm_access");

        let claims: TokenClaims = serde_json::from_value(json).unwrap();
        assert!(claims.assemble_scopes().is_empty());
    }

    #[test]
    fn test_tenant_claim_default_name() {
        let claims: TokenClaims = serde_json::from_value(full_claims_json()).unwrap();

        assert_eq!(
            claims.tenant_claim("tenant_id"),
            Some("3fa85f64-5717-4562-b3fc-2c963f66afa6")
        );
    }

    #[test]
    fn test_tenant_claim_custom_name_reads_extra_claims() {
        let mut json = full_claims_json();
        json["org_id"] = serde_json::json!("deadbeef-0000-4000-8000-000000000000");

        let claims: TokenClaims = serde_json::from_value(json).unwrap();

        assert_eq!(
            claims.tenant_claim("org_id"),
            Some("deadbeef-0000-4000-8000-000000000000")
        );
        assert!(claims.tenant_claim("missing_claim").is_none());
    }

    #[test]
    fn test_tenant_claim_non_string_is_absent() {
        let mut json = full_claims_json();
        json["org_id"] = serde_json::json!(42);

        let claims: TokenClaims = serde_json::from_value(json).unwrap();
        assert!(claims.tenant_claim("org_id").is_none());
    }

    #[test]
    fn test_claims_debug_redacts_personal_fields() {
        let claims: TokenClaims = serde_json::from_value(full_claims_json()).unwrap();

        let debug_output = format!("{claims:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("user-123"));
        assert!(!debug_output.contains("user@example.com"));
        assert!(!debug_output.contains("Test User"));
        // Operational fields stay visible
        assert!(debug_output.contains("token-abc"));
    }

    #[test]
    fn test_user_debug_redacts_email_but_keeps_ids() {
        let user = AuthenticatedUser {
            user_id: "user-123".to_string(),
            tenant_id: Some("3fa85f64-5717-4562-b3fc-2c963f66afa6".to_string()),
            jti: "token-abc".to_string(),
            exp: 1_900_000_000,
            email: Some("user@example.com".to_string()),
            name: Some("Test User".to_string()),
            scopes: BTreeSet::new(),
            issuer: "https://auth.example.com".to_string(),
        };

        let debug_output = format!("{user:?}");

        assert!(debug_output.contains("user-123"));
        assert!(debug_output.contains("token-abc"));
        assert!(!debug_output.contains("user@example.com"));
        assert!(!debug_output.contains("Test User"));
    }

    #[test]
    fn test_has_scope() {
        let user = AuthenticatedUser {
            user_id: "user-123".to_string(),
            tenant_id: None,
            jti: "token-abc".to_string(),
            exp: 1_900_000_000,
            email: None,
            name: None,
            scopes: [scopes::STATEMENTS_READ.to_string()].into_iter().collect(),
            issuer: "https://auth.example.com".to_string(),
        };

        assert!(user.has_scope(scopes::STATEMENTS_READ));
        assert!(!user.has_scope(scopes::STATEMENTS_WRITE));
    }
}
