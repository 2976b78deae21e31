//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating JWT claim sets that match the
//! gateway's claim schema.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Builder for creating test JWT claims
///
/// Every build gets a fresh random `jti` so revocation state never
/// leaks between tests.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_tenant("A1B2C3D4-0000-0000-0000-000000000001")
///     .with_scope("statements/read statements/write")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    iss: String,
    aud: Value,
    exp: i64,
    iat: i64,
    jti: String,
    tenant_id: Option<String>,
    scope: Option<String>,
    realm_roles: Option<Vec<String>>,
    email: Option<String>,
    name: Option<String>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            iss: "https://auth.test.example.com/realms/gatehouse".to_string(),
            aud: json!("gatehouse-api"),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            tenant_id: None,
            scope: None,
            realm_roles: None,
            email: None,
            name: None,
            extra: Map::new(),
        }
    }

    /// Set the subject (user/service)
    #[must_use]
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set a single-string audience
    #[must_use]
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = json!(audience);
        self
    }

    /// Set an array-form audience
    #[must_use]
    pub fn with_audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = json!(audiences);
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    #[must_use]
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    #[must_use]
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Set the token ID
    #[must_use]
    pub fn with_jti(mut self, jti: &str) -> Self {
        self.jti = jti.to_string();
        self
    }

    /// Set the tenant ID claim
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    /// Set the scope claim (space-separated)
    #[must_use]
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    /// Set Keycloak-style realm roles
    #[must_use]
    pub fn with_realm_roles(mut self, roles: &[&str]) -> Self {
        self.realm_roles = Some(roles.iter().map(|r| (*r).to_string()).collect());
        self
    }

    /// Set the email claim
    #[must_use]
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Set the display name claim
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add an arbitrary claim (e.g. a custom tenant claim name)
    #[must_use]
    pub fn claim(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Build the claims as a JSON value
    #[must_use]
    pub fn build(self) -> Value {
        let mut claims = json!({
            "sub": self.sub,
            "iss": self.iss,
            "aud": self.aud,
            "exp": self.exp,
            "iat": self.iat,
            "jti": self.jti,
        });

        let map = claims.as_object_mut().expect("claims literal is an object");

        if let Some(tenant_id) = self.tenant_id {
            map.insert("tenant_id".to_string(), json!(tenant_id));
        }
        if let Some(scope) = self.scope {
            map.insert("scope".to_string(), json!(scope));
        }
        if let Some(roles) = self.realm_roles {
            map.insert("realm_access".to_string(), json!({ "roles": roles }));
        }
        if let Some(email) = self.email {
            map.insert("email".to_string(), json!(email));
        }
        if let Some(name) = self.name {
            map.insert("name".to_string(), json!(name));
        }
        for (key, value) in self.extra {
            map.insert(key, value);
        }

        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_valid_claims() {
        let claims = TestTokenBuilder::new()
            .for_user("alice")
            .with_scope("statements/read")
            .build();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["scope"], "statements/read");
        assert_eq!(claims["aud"], "gatehouse-api");
        assert!(claims["exp"].as_i64().unwrap() > claims["iat"].as_i64().unwrap());
        assert!(!claims["jti"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_builder_default_omits_optional_claims() {
        let claims = TestTokenBuilder::default().build();

        assert_eq!(claims["sub"], "test-subject");
        assert!(claims.get("tenant_id").is_none());
        assert!(claims.get("scope").is_none());
        assert!(claims.get("realm_access").is_none());
    }

    #[test]
    fn test_builder_jti_is_unique_per_build() {
        let a = TestTokenBuilder::new().build();
        let b = TestTokenBuilder::new().build();

        assert_ne!(a["jti"], b["jti"]);
    }

    #[test]
    fn test_builder_array_audience_and_roles() {
        let claims = TestTokenBuilder::new()
            .with_audiences(&["gatehouse-api", "other-api"])
            .with_realm_roles(&["admin", "state/read"])
            .build();

        assert_eq!(claims["aud"], json!(["gatehouse-api", "other-api"]));
        assert_eq!(claims["realm_access"]["roles"], json!(["admin", "state/read"]));
    }

    #[test]
    fn test_builder_custom_claim() {
        let claims = TestTokenBuilder::new()
            .claim("org_id", "f47ac10b-58cc-4372-a567-0e02b2c3d479")
            .build();

        assert_eq!(claims["org_id"], "f47ac10b-58cc-4372-a567-0e02b2c3d479");
    }

    #[test]
    fn test_builder_expired_token() {
        let claims = TestTokenBuilder::new().expires_in(-600).build();

        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
    }
}
