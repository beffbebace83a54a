//! Service layer for the product gateway.
//!
//! Collaborators the gateway forwards authorized requests to.

pub mod product_service;

pub use product_service::{ProductService, UnimplementedProductService};
