//! Product Gateway Library
//!
//! An HTTP API gateway that serves a product catalogue front end and
//! guards the product API behind bearer-token authentication. Tokens are
//! RS256 JWTs issued by an external identity provider and verified against
//! the provider's published JWKS.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs (Gate) -> handlers/*.rs -> services/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token gate: claims, JWKS cache, certificate keys, signature checks
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer authentication and HTTP metrics
//! - `models` - Response bodies
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Downstream product operations

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;

pub use observability::metrics::init_metrics_recorder;
