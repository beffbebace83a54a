//! Product handlers.
//!
//! Both routes sit behind the token gate; by the time a handler runs the
//! request has been allowed and its `Claims` are in the request extensions.

use crate::auth::Claims;
use crate::errors::GatewayError;
use crate::models::FeedbackAccepted;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Longest slug accepted.
const MAX_SLUG_LENGTH: usize = 128;

/// Handler for GET /products
#[instrument(skip_all, name = "gw.handlers.list_products")]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, GatewayError> {
    tracing::debug!(target: "gw.handlers.products", scope = ?claims.scope, "Listing products");

    let products = state.product_service.list_products().await?;
    Ok(Json(products))
}

/// Handler for POST /products/{slug}/feedback
///
/// Forwards the body untouched and answers 202 Accepted.
#[instrument(skip_all, name = "gw.handlers.add_feedback", fields(slug = %slug))]
pub async fn add_feedback(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<FeedbackAccepted>), GatewayError> {
    validate_slug(&slug)?;

    tracing::debug!(target: "gw.handlers.products", body_len = body.len(), "Forwarding feedback");

    state.product_service.add_feedback(&slug, body).await?;
    Ok((StatusCode::ACCEPTED, Json(FeedbackAccepted::new(slug))))
}

/// Slugs are URL-safe identifiers: ASCII letters, digits, `-` and `_`.
fn validate_slug(slug: &str) -> Result<(), GatewayError> {
    let valid = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(GatewayError::BadRequest("Invalid product slug".to_string()))
    }
}
