//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use them for all
//! sensitive configuration values: store connection URLs with embedded
//! credentials, client secrets, and raw key material.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` while holding one gets safe logging behavior for free;
//! reading the value requires an explicit `expose_secret()` call. Secrets are
//! zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StoreConfig {
//!     redis_url: SecretString, // Debug shows "[REDACTED]"
//! }
//!
//! let cfg = StoreConfig {
//!     redis_url: SecretString::from("redis://:hunter2@localhost:6379/0"),
//! };
//!
//! // Safe: the URL (and its password) is redacted
//! println!("{:?}", cfg);
//!
//! // Explicit access only
//! let url: &str = cfg.redis_url.expose_secret();
//! # let _ = url;
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
