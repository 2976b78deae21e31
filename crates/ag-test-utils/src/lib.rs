//! # Auth Gateway Test Utilities
//!
//! Shared test utilities for the authentication gateway.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys, JWK encoding)
//! - Test data builders (`TestTokenBuilder` for claim sets)
//! - Mock stores (`MockRateLimitStore`, `MockRevocationStore`)
//! - Server test harness (`TestGateway` with a mock JWKS provider)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ag_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let gateway = TestGateway::spawn().await.unwrap();
//!
//!     let token = gateway.token(
//!         TestTokenBuilder::new()
//!             .for_user("alice")
//!             .with_scope("statements/read"),
//!     );
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me", gateway.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(response.status(), 200);
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_stores;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_stores::*;
pub use server_harness::*;
pub use token_builders::*;
