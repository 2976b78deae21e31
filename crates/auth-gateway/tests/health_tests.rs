//! Health, readiness and metrics endpoint integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use ag_test_utils::{MockRevocationStore, TestGateway};
use anyhow::Result;
use serde_json::Value;

/// Test that the liveness probe answers without authentication.
#[tokio::test]
async fn test_health_endpoint_is_public() -> Result<()> {
    let gateway = TestGateway::spawn().await?;

    let response = reqwest::get(format!("{}/health", gateway.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// Test that the readiness probe reports ready while the store answers.
#[tokio::test]
async fn test_ready_endpoint_reports_ready() -> Result<()> {
    let gateway = TestGateway::spawn().await?;

    let response = reqwest::get(format!("{}/ready", gateway.url())).await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["redis"], "healthy");
    assert!(body.get("error").is_none());

    Ok(())
}

/// Test that the readiness probe reports not ready when the store is
/// unreachable, without leaking details about the failure.
#[tokio::test]
async fn test_ready_endpoint_reports_dependency_outage() -> Result<()> {
    let gateway = TestGateway::builder()
        .revocation_store(MockRevocationStore::new().with_failing_checks())
        .spawn()
        .await?;

    let response = reqwest::get(format!("{}/ready", gateway.url())).await?;
    assert_eq!(response.status(), 503);

    let body: Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["redis"], "unhealthy");
    assert_eq!(body["error"], "Service dependencies unavailable");

    Ok(())
}

/// Test that the Prometheus scrape endpoint answers without
/// authentication. Body contents are covered by unit tests; only the
/// first harness in a test process owns the installed recorder, so
/// asserting on rendered metrics here would be order-dependent.
#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<()> {
    let gateway = TestGateway::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", gateway.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that unknown routes fall through to 404.
#[tokio::test]
async fn test_unknown_route_is_404() -> Result<()> {
    let gateway = TestGateway::spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/unknown", gateway.url())).await?;
    assert_eq!(response.status(), 404);

    Ok(())
}
