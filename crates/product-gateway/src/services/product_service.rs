//! Downstream product operations.
//!
//! The gateway forwards authorized requests to a `ProductService`. The
//! product catalogue and feedback store live outside this repository; the
//! service shipped here answers every operation with 501 until a backend is
//! wired in.

use crate::errors::GatewayError;
use bytes::Bytes;
use serde_json::Value;
use tracing::instrument;

/// Operations reachable behind the token gate.
#[async_trait::async_trait]
pub trait ProductService: Send + Sync {
    /// List the product catalogue as a JSON document.
    async fn list_products(&self) -> Result<Value, GatewayError>;

    /// Submit feedback for the product identified by `slug`.
    ///
    /// `body` is the request body exactly as received.
    async fn add_feedback(&self, slug: &str, body: Bytes) -> Result<(), GatewayError>;
}

/// Placeholder backend: every operation is not implemented.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedProductService;

#[async_trait::async_trait]
impl ProductService for UnimplementedProductService {
    #[instrument(skip_all, name = "gw.services.list_products")]
    async fn list_products(&self) -> Result<Value, GatewayError> {
        Err(GatewayError::NotImplemented("list_products".to_string()))
    }

    #[instrument(skip_all, name = "gw.services.add_feedback", fields(slug = %slug))]
    async fn add_feedback(&self, slug: &str, _body: Bytes) -> Result<(), GatewayError> {
        Err(GatewayError::NotImplemented("add_feedback".to_string()))
    }
}

/// Mock product service module for testing.
///
/// Records every call so tests can assert whether a downstream operation ran.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// A recorded `add_feedback` call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FeedbackCall {
        pub slug: String,
        pub body: Bytes,
    }

    /// Mock product service.
    pub struct MockProductService {
        /// Catalogue returned by `list_products`.
        products: Value,
        /// Whether to return errors.
        return_error: bool,
        list_calls: AtomicUsize,
        feedback_calls: Mutex<Vec<FeedbackCall>>,
    }

    impl MockProductService {
        /// Create a mock that serves `products` and accepts all feedback.
        pub fn with_products(products: Value) -> Self {
            Self {
                products,
                return_error: false,
                list_calls: AtomicUsize::new(0),
                feedback_calls: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock with an empty catalogue.
        pub fn accepting() -> Self {
            Self::with_products(Value::Array(Vec::new()))
        }

        /// Create a mock whose operations fail with 503.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::accepting()
            }
        }

        /// Number of `list_products` calls made.
        pub fn list_call_count(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        /// All `add_feedback` calls made, in order.
        pub async fn feedback_calls(&self) -> Vec<FeedbackCall> {
            self.feedback_calls.lock().await.clone()
        }

        /// Number of downstream calls of any kind.
        pub async fn total_call_count(&self) -> usize {
            self.list_call_count() + self.feedback_calls.lock().await.len()
        }
    }

    #[async_trait::async_trait]
    impl ProductService for MockProductService {
        async fn list_products(&self) -> Result<Value, GatewayError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);

            if self.return_error {
                return Err(GatewayError::ServiceUnavailable(
                    "Mock product service error".to_string(),
                ));
            }

            Ok(self.products.clone())
        }

        async fn add_feedback(&self, slug: &str, body: Bytes) -> Result<(), GatewayError> {
            self.feedback_calls.lock().await.push(FeedbackCall {
                slug: slug.to_string(),
                body,
            });

            if self.return_error {
                return Err(GatewayError::ServiceUnavailable(
                    "Mock product service error".to_string(),
                ));
            }

            Ok(())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unimplemented_list_products() {
        let result = UnimplementedProductService.list_products().await;
        assert!(matches!(result, Err(GatewayError::NotImplemented(_))));
    }

    #[tokio::test]
    async fn test_unimplemented_add_feedback() {
        let result = UnimplementedProductService
            .add_feedback("widget-1", Bytes::from_static(b"great"))
            .await;
        assert!(matches!(result, Err(GatewayError::NotImplemented(op)) if op == "add_feedback"));
    }
}
