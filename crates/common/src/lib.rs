//! Common utilities shared across the product gateway crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (unverified parsing, size limits, temporal claims)
pub mod jwt;
