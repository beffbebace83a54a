//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, runs it through
//! the token gate, and injects the verified claims into request extensions.
//! The request is otherwise forwarded unmodified.

use crate::auth::{Claims, Gate};
use crate::auth::error::AuthError;
use crate::auth::gate::GateStage;
use crate::errors::GatewayError;
use crate::observability::metrics::record_token_validation;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token gate shared by all protected routes.
    pub gate: Arc<Gate>,
}

/// Extract the Bearer token from the Authorization header.
///
/// The scheme is matched case-insensitively; anything other than exactly
/// `Bearer <token>` counts as missing credentials.
fn extract_bearer_token(req: &Request) -> Result<&str, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "gw.middleware.auth", "Missing Authorization header");
            AuthError::MissingCredentials
        })?;

    match auth_header.trim().split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
        {
            Ok(token.trim())
        }
        _ => {
            tracing::debug!(target: "gw.middleware.auth", "Invalid Authorization header format");
            Err(AuthError::MissingCredentials)
        }
    }
}

/// Authentication middleware.
///
/// # Response
///
/// - Returns 401 Unauthorized if the token is missing or rejected by the gate;
///   the downstream handler never runs
/// - Continues to next handler with `Claims` in extensions if the token is allowed
#[instrument(skip_all, name = "gw.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    let token = match extract_bearer_token(&req) {
        Ok(token) => token,
        Err(e) => {
            record_token_validation(
                "rejected",
                e.reason(),
                GateStage::Received.as_str(),
                Duration::ZERO,
            );
            return Err(e.into());
        }
    };

    let claims = state.gate.check(token).await?;

    // Store claims in request extensions for downstream handlers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from request.
pub trait ClaimsExt {
    /// Get the authenticated claims from request extensions.
    ///
    /// Returns `None` if auth middleware was not applied to this request.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    // Full middleware tests need a signed token and a JWKS endpoint, which
    // live in the integration tests. These cover header parsing.
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/products");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&req), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_token_scheme_is_case_insensitive() {
        let req = request_with_auth(Some("bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&req), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header_is_missing_credentials() {
        let req = request_with_auth(None);
        assert_eq!(
            extract_bearer_token(&req),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_wrong_scheme_or_empty_token_is_missing_credentials() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "abc.def.ghi", ""] {
            let req = request_with_auth(Some(value));
            assert_eq!(
                extract_bearer_token(&req),
                Err(AuthError::MissingCredentials),
                "{value:?} should not yield a token"
            );
        }
    }

    #[test]
    fn test_claims_ext_without_auth() {
        let req = request_with_auth(None);
        assert!(req.claims().is_none());
    }
}
