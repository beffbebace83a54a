//! Observability module for the product gateway.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
