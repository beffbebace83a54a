//! HTTP request handlers for the product gateway.

pub mod health;
pub mod metrics;
pub mod products;

pub use health::{readiness_check, status_check};
pub use metrics::metrics_handler;
pub use products::{add_feedback, list_products};
