//! Authentication module for the product gateway.
//!
//! Validates bearer tokens issued by the identity provider against the keys
//! published at its JWKS endpoint.
//!
//! # Components
//!
//! - `claims` - Claims, validation context and the audience / issuer checks
//! - `jwks` - JWKS client for fetching and caching the provider's keys
//! - `certificate` - PEM formatting of `x5c` entries into verification keys
//! - `jwt` - Signature and temporal claim verification
//! - `gate` - The request-time pipeline tying the above together
//! - `error` - Failure taxonomy

pub mod certificate;
pub mod claims;
pub mod error;
pub mod gate;
pub mod jwks;
pub mod jwt;

pub use claims::{Claims, ValidationContext};
pub use error::AuthError;
pub use gate::{Gate, GateRejection, GateStage};
pub use jwks::{JwksClient, JwksOptions, KeySource};
