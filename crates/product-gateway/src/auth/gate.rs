//! Request-time token gate.
//!
//! Runs the validation pipeline for a bearer token and decides allow or
//! deny. Stages, in order:
//!
//! ```text
//! RECEIVED -> CLAIMS_CHECKED -> KEY_RESOLVED -> SIGNATURE_CHECKED -> ALLOWED
//! ```
//!
//! The first failing step rejects the token; the rejection records the last
//! stage that was reached. The gate holds no per-request state, so one
//! instance serves all concurrent requests.

use crate::auth::certificate::decoding_key_from_certificate;
use crate::auth::claims::{validate_claims, Claims, ValidationContext};
use crate::auth::error::{AuthError, KeyResolutionError};
use crate::auth::jwks::KeySource;
use crate::auth::jwt::verify_signature;
use crate::observability::metrics::record_token_validation;
use common::jwt::UnverifiedToken;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Position of a token in the validation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Received,
    ClaimsChecked,
    KeyResolved,
    SignatureChecked,
    Allowed,
}

impl GateStage {
    /// Label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            GateStage::Received => "received",
            GateStage::ClaimsChecked => "claims_checked",
            GateStage::KeyResolved => "key_resolved",
            GateStage::SignatureChecked => "signature_checked",
            GateStage::Allowed => "allowed",
        }
    }
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected token: why, and how far it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRejection {
    /// Last stage the token reached before failing.
    pub stage: GateStage,

    /// The failure.
    pub reason: AuthError,
}

impl GateRejection {
    pub fn new(stage: GateStage, reason: impl Into<AuthError>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for GateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rejected at {}: {}", self.stage, self.reason)
    }
}

impl std::error::Error for GateRejection {}

/// Token gate: claim checks, key resolution and signature verification.
pub struct Gate {
    context: Arc<ValidationContext>,
    keys: Arc<dyn KeySource>,
}

impl Gate {
    /// Create a gate.
    ///
    /// # Arguments
    ///
    /// * `context` - Expected audience, issuer, algorithm and clock skew
    /// * `keys` - Where verification certificates come from
    pub fn new(context: Arc<ValidationContext>, keys: Arc<dyn KeySource>) -> Self {
        Self { context, keys }
    }

    /// The validation context this gate checks against.
    pub fn context(&self) -> &ValidationContext {
        &self.context
    }

    /// Validate a bearer token.
    ///
    /// Returns the verified claims when the token is allowed.
    ///
    /// # Errors
    ///
    /// Returns a [`GateRejection`] carrying the failure and the last stage
    /// reached. Every rejection is terminal; nothing is retried.
    #[instrument(skip_all, name = "gw.auth.gate")]
    pub async fn check(&self, token: &str) -> Result<Claims, GateRejection> {
        let start = Instant::now();
        let result = self.run(token).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::debug!(target: "gw.auth.gate", "Token allowed");
                record_token_validation("allowed", "none", GateStage::Allowed.as_str(), duration);
            }
            Err(rejection) => {
                tracing::info!(
                    target: "gw.auth.gate",
                    stage = %rejection.stage,
                    reason = rejection.reason.reason(),
                    "Token rejected"
                );
                record_token_validation(
                    "rejected",
                    rejection.reason.reason(),
                    rejection.stage.as_str(),
                    duration,
                );
            }
        }

        result
    }

    async fn run(&self, token: &str) -> Result<Claims, GateRejection> {
        // RECEIVED
        let unverified = UnverifiedToken::parse(token)
            .map_err(|e| GateRejection::new(GateStage::Received, e))?;

        validate_claims(&unverified.claims, &self.context)
            .map_err(|e| GateRejection::new(GateStage::Received, e))?;

        // CLAIMS_CHECKED
        let kid = unverified.kid().ok_or_else(|| {
            tracing::debug!(target: "gw.auth.gate", "Token has no kid header");
            GateRejection::new(GateStage::ClaimsChecked, KeyResolutionError::NoMatchingKey)
        })?;

        let certificate = self
            .keys
            .certificate_for(kid)
            .await
            .map_err(|e| GateRejection::new(GateStage::ClaimsChecked, e))?;

        let key = decoding_key_from_certificate(&certificate)
            .map_err(|e| GateRejection::new(GateStage::ClaimsChecked, e))?;

        // KEY_RESOLVED
        let claims = verify_signature(&unverified, &key, &self.context)
            .map_err(|e| GateRejection::new(GateStage::KeyResolved, e))?;

        // SIGNATURE_CHECKED -> ALLOWED
        Ok(claims)
    }
}
