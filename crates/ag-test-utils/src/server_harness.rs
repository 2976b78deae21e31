//! Test server harness for E2E testing
//!
//! Provides `TestGateway` for spawning real gateway instances in tests,
//! backed by a wiremock JWKS provider and in-memory stores.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use crate::mock_stores::{MockRateLimitStore, MockRevocationStore};
use crate::token_builders::TestTokenBuilder;
use auth_gateway::auth::{JwksClient, TokenValidator};
use auth_gateway::config::Config;
use auth_gateway::observability::metrics::init_metrics_recorder;
use auth_gateway::rate_limit::RateLimiter;
use auth_gateway::routes::{build_routes, AppState};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Tenant UUID used by default-issued test tokens.
pub const TEST_TENANT_ID: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";

/// Audience the harness configures the gateway with.
pub const TEST_AUDIENCE: &str = "gatehouse-api";

/// Issuer path mounted on the mock provider.
const ISSUER_PATH: &str = "/realms/test";

/// Test harness for spawning the gateway in E2E tests
///
/// The harness stands up:
/// - a wiremock server publishing a JWKS document for a deterministic
///   Ed25519 keypair
/// - in-memory rate limit and revocation stores with failure injection
/// - the real router bound to a random port
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_me_endpoint() {
///     let gateway = TestGateway::spawn().await.unwrap();
///     let token = gateway.token(gateway.claims().for_user("alice"));
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/api/v1/me", gateway.url()))
///         .bearer_auth(token)
///         .send()
///         .await
///         .unwrap();
///
///     assert_eq!(response.status(), 200);
/// }
/// ```
pub struct TestGateway {
    addr: SocketAddr,
    jwks_server: MockServer,
    keypair: TestKeypair,
    config: Arc<Config>,
    rate_limits: MockRateLimitStore,
    revocations: MockRevocationStore,
    _handle: JoinHandle<()>,
}

/// Options for spawning a [`TestGateway`].
pub struct TestGatewayBuilder {
    vars: HashMap<String, String>,
    keypair_seed: u8,
    rate_limits: MockRateLimitStore,
    revocations: MockRevocationStore,
}

impl Default for TestGatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestGatewayBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            keypair_seed: 1,
            rate_limits: MockRateLimitStore::new(),
            revocations: MockRevocationStore::new(),
        }
    }

    /// Override a configuration variable (e.g. `RATE_LIMIT_REQUESTS_PER_MINUTE`).
    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Use a different deterministic signing key.
    #[must_use]
    pub fn keypair_seed(mut self, seed: u8) -> Self {
        self.keypair_seed = seed;
        self
    }

    /// Replace the rate limit store (e.g. a failing one).
    #[must_use]
    pub fn rate_limit_store(mut self, store: MockRateLimitStore) -> Self {
        self.rate_limits = store;
        self
    }

    /// Replace the revocation store (e.g. pre-revoked or failing).
    #[must_use]
    pub fn revocation_store(mut self, store: MockRevocationStore) -> Self {
        self.revocations = store;
        self
    }

    /// Spawn the gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing or binding fails.
    pub async fn spawn(self) -> Result<TestGateway, anyhow::Error> {
        let jwks_server = MockServer::start().await;
        let keypair = TestKeypair::generate(self.keypair_seed);

        Mock::given(method("GET"))
            .and(path(format!("{ISSUER_PATH}/.well-known/jwks.json")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(jwks_document(&[&keypair])),
            )
            .mount(&jwks_server)
            .await;

        let issuer = format!("{}{ISSUER_PATH}", jwks_server.uri());

        // Base configuration; per-test overrides win. The Redis URL is
        // never dialed because both stores are in-memory mocks. The
        // wide rate limit window keeps fixed-window boundaries out of
        // test runs.
        let mut vars = HashMap::from([
            ("OAUTH_ISSUER_URL".to_string(), issuer),
            ("OAUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("OAUTH_ALGORITHMS".to_string(), "EdDSA".to_string()),
            (
                "REDIS_URL".to_string(),
                "redis://127.0.0.1:6379/15".to_string(),
            ),
            ("RATE_LIMIT_WINDOW_SECONDS".to_string(), "86400".to_string()),
            (
                "RATE_LIMIT_REQUESTS_PER_MINUTE".to_string(),
                "10000".to_string(),
            ),
            (
                "RATE_LIMIT_FAILED_AUTH_PER_MINUTE".to_string(),
                "1000".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        vars.extend(self.vars);

        let config = Arc::new(
            Config::from_vars(&vars)
                .map_err(|e| anyhow::anyhow!("Failed to build test config: {e}"))?,
        );

        let jwks = Arc::new(JwksClient::new(&config));
        let validator = Arc::new(TokenValidator::new(
            Arc::clone(&config),
            jwks,
            Arc::new(self.revocations.clone()),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            Arc::new(self.rate_limits.clone()),
            &config,
        ));

        let state = Arc::new(AppState {
            config: Arc::clone(&config),
            validator,
            rate_limiter,
            revocation: Arc::new(self.revocations.clone()),
        });

        // Initialize metrics recorder for the test server.
        // Note: This may fail if already installed in the test process.
        // In that case, we create a new recorder without installing it
        // globally so each gateway still gets a working handle.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {e}"))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {e}"))?;

        let handle = tokio::spawn(async move {
            // ConnectInfo is required for client IP extraction
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {e}");
            }
        });

        Ok(TestGateway {
            addr,
            jwks_server,
            keypair,
            config,
            rate_limits: self.rate_limits,
            revocations: self.revocations,
            _handle: handle,
        })
    }
}

impl TestGateway {
    /// Spawn a gateway with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing or binding fails.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::builder().spawn().await
    }

    #[must_use]
    pub fn builder() -> TestGatewayBuilder {
        TestGatewayBuilder::new()
    }

    /// Base URL of the running gateway.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Socket address of the running gateway.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Issuer the gateway trusts (served by the mock provider).
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.config.oauth_issuer_url
    }

    /// Gateway configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The signing keypair published in the mock JWKS.
    #[must_use]
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// The mock JWKS provider, for remounting rotated key sets.
    #[must_use]
    pub fn jwks_server(&self) -> &MockServer {
        &self.jwks_server
    }

    /// The in-memory rate limit store backing the gateway.
    #[must_use]
    pub fn rate_limits(&self) -> &MockRateLimitStore {
        &self.rate_limits
    }

    /// The in-memory revocation store backing the gateway.
    #[must_use]
    pub fn revocations(&self) -> &MockRevocationStore {
        &self.revocations
    }

    /// Claim builder pre-filled with this gateway's issuer, audience
    /// and a valid tenant.
    #[must_use]
    pub fn claims(&self) -> TestTokenBuilder {
        TestTokenBuilder::new()
            .with_issuer(self.issuer())
            .with_audience(TEST_AUDIENCE)
            .with_tenant(TEST_TENANT_ID)
    }

    /// Sign a claim builder into an accepted bearer token.
    #[must_use]
    pub fn token(&self, builder: TestTokenBuilder) -> String {
        self.keypair.sign(&builder.build())
    }

    /// Sign an arbitrary claim set with the published key.
    #[must_use]
    pub fn sign_claims(&self, claims: &Value) -> String {
        self.keypair.sign(claims)
    }

    /// Replace the published JWKS document, e.g. after key rotation.
    pub async fn publish_jwks(&self, keys: &[&TestKeypair]) {
        self.jwks_server.reset().await;
        Mock::given(method("GET"))
            .and(path(format!("{ISSUER_PATH}/.well-known/jwks.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .mount(&self.jwks_server)
            .await;
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        // Explicitly abort the HTTP server task to ensure immediate
        // cleanup when the test completes.
        self._handle.abort();
    }
}
