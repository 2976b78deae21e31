//! Observability module for the authentication gateway.
//!
//! Provides metrics definitions and instrumentation helpers.

pub mod metrics;
