//! Test utilities for the product gateway.
//!
//! - `keys` - RSA signing fixtures and JWKS documents
//! - `tokens` - Claim sets for valid, expired and otherwise broken tokens
//! - `jwks_server` - Mock identity provider JWKS endpoint (wiremock)
//! - `server_harness` - `TestGatewayServer` running the real router

pub mod jwks_server;
pub mod keys;
pub mod server_harness;
pub mod tokens;

pub use jwks_server::{TestJwksServer, JWKS_PATH};
pub use keys::{jwks_document, TestSigningKey};
pub use server_harness::{test_metrics_handle, workspace_root, TestGatewayServer};
pub use tokens::{TestClaims, TEST_AUDIENCE, TEST_ISSUER};
