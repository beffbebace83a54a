//! Status and readiness handlers.
//!
//! - `/status`: Liveness - returns a fixed message while the process runs
//! - `/ready`: Readiness - checks the identity provider key set can be loaded

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Body returned by `/status`.
pub const STATUS_MESSAGE: &str = "API is up and running";

/// Liveness handler.
///
/// Does NOT check any dependencies and never runs the token gate.
pub async fn status_check() -> &'static str {
    STATUS_MESSAGE
}

/// Readiness probe handler.
///
/// Returns 200 when a key set is cached or can be fetched, 503 otherwise.
///
/// ## Security
///
/// Error messages are intentionally generic to avoid leaking infrastructure details.
/// Actual errors are logged server-side with `tracing::warn!`.
#[tracing::instrument(skip_all, name = "gw.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.jwks_client.ensure_loaded().await {
        Ok(key_count) => {
            tracing::debug!(target: "gw.health", key_count, "Readiness check passed");
            (
                StatusCode::OK,
                Json(ReadinessResponse {
                    status: "ready",
                    jwks: Some("available"),
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::warn!(target: "gw.health", error = %e, "Readiness check failed: JWKS unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    jwks: Some("unavailable"),
                    // Generic error - don't leak infrastructure details
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
