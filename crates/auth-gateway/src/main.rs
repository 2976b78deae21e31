//! Authentication Gateway
//!
//! Entry point for the Gatehouse authentication gateway. Terminates
//! OAuth2 bearer authentication at the edge: validates JWTs against the
//! provider's published JWKS, enforces distributed rate limits, checks
//! revocation, and hands verified identity to protected handlers.

use auth_gateway::auth::{JwksClient, TokenValidator};
use auth_gateway::config::Config;
use auth_gateway::observability::metrics::init_metrics_recorder;
use auth_gateway::rate_limit::RateLimiter;
use auth_gateway::redis::RedisClient;
use auth_gateway::routes::{build_routes, AppState};
use common::secret::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Authentication Gateway");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        oauth_issuer_url = %config.oauth_issuer_url,
        jwks_url = %config.jwks_url,
        bind_address = %config.bind_address,
        allowed_algorithms = ?config.allowed_algorithms,
        rate_limit_enabled = config.rate_limit_enabled,
        rate_limit_requests_per_minute = config.rate_limit_requests_per_minute,
        rate_limit_failed_auth_per_minute = config.rate_limit_failed_auth_per_minute,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    info!("Initializing Prometheus metrics recorder...");
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    // Initialize Redis connection
    info!("Connecting to Redis...");
    let redis_client = Arc::new(
        RedisClient::new(config.redis_url.expose_secret())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to Redis");
                e
            })?,
    );
    info!("Redis connection established");

    // Assemble the validation pipeline
    let config = Arc::new(config);
    let jwks = Arc::new(JwksClient::new(&config));
    let validator = Arc::new(TokenValidator::new(
        config.clone(),
        jwks,
        redis_client.clone(),
    ));
    let rate_limiter = Arc::new(RateLimiter::new(redis_client.clone(), &config));

    let state = Arc::new(AppState {
        config: config.clone(),
        validator,
        rate_limiter,
        revocation: redis_client,
    });

    // Build application routes
    let app = build_routes(state, prometheus_handle);

    // Parse bind address
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Authentication Gateway listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Authentication Gateway shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    // Graceful shutdown drain period. Keeps the pod serving while the
    // load balancer catches up to the terminating state.
    let drain_secs: u64 = std::env::var("AG_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (AG_DRAIN_SECONDS=0)");
    }
}
