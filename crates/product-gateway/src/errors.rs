//! Product gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use crate::auth::error::AuthError;
use crate::auth::gate::GateRejection;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned for every authentication failure.
pub const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"product-gateway\", error=\"invalid_token\"";

/// Product gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - BadRequest: 400 Bad Request
/// - NotImplemented: 501 Not Implemented
/// - ServiceUnavailable: 503 Service Unavailable
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request rejected by the token gate. The reason is for logs only.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unauthorized(_) => 401,
            GatewayError::BadRequest(_) => 400,
            GatewayError::NotImplemented(_) => 501,
            GatewayError::ServiceUnavailable(_) => 503,
            GatewayError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::Unauthorized(reason) => {
                // Reason was already logged by the gate; never echo it
                tracing::debug!(target: "gw.errors", reason = %reason, "Request unauthorized");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    INVALID_TOKEN_MESSAGE.to_string(),
                )
            }
            GatewayError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            GatewayError::NotImplemented(operation) => {
                tracing::debug!(target: "gw.errors", operation = %operation, "Operation not implemented");
                (
                    StatusCode::NOT_IMPLEMENTED,
                    "NOT_IMPLEMENTED",
                    "Not Implemented".to_string(),
                )
            }
            GatewayError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "gw.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
            );
        }

        response
    }
}

impl From<GateRejection> for GatewayError {
    fn from(rejection: GateRejection) -> Self {
        GatewayError::Unauthorized(rejection.to_string())
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        GatewayError::Unauthorized(err.reason().to_string())
    }
}
