//! Product gateway models.
//!
//! Response bodies produced by the gateway itself.

use serde::{Deserialize, Serialize};

/// Readiness check response.
///
/// Returned by the `/ready` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness ("ready" or "not_ready").
    pub status: &'static str,

    /// Identity provider key set status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<&'static str>,

    /// Generic error message when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Acknowledgement for accepted product feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackAccepted {
    /// Always "accepted".
    pub status: String,

    /// Product the feedback was submitted for.
    pub slug: String,
}

impl FeedbackAccepted {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            status: "accepted".to_string(),
            slug: slug.into(),
        }
    }
}
