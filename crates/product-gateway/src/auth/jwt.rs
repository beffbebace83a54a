//! Signature and temporal claim verification.
//!
//! # Security
//!
//! - Only the configured algorithm is accepted; the header's `alg` is compared
//!   before any cryptographic work, so `none` and HMAC downgrades never reach
//!   the verifier
//! - `exp` and `nbf` are enforced with the configured leeway
//! - `iat` may not lie further in the future than the leeway
//! - `exp` is optional: tokens without it are accepted once the signature holds

use crate::auth::claims::{Claims, ValidationContext};
use crate::auth::error::SignatureError;
use common::jwt::{validate_iat, UnverifiedToken};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

/// Verify the token's signature with `key` and return the typed claims.
///
/// Audience and issuer are checked earlier in the pipeline and are not
/// re-validated here.
///
/// # Errors
///
/// - `AlgorithmMismatch` - header `alg` is not the configured algorithm
/// - `Expired` / `NotYetValid` - `exp`, `nbf` or `iat` out of range
/// - `InvalidSignature` - signature mismatch or unusable key material
/// - `Undecodable` - the token content could not be decoded
pub fn verify_signature(
    token: &UnverifiedToken<'_>,
    key: &DecodingKey,
    context: &ValidationContext,
) -> Result<Claims, SignatureError> {
    let declared = token.header.alg.parse::<Algorithm>().ok();
    if declared != Some(context.algorithm) {
        tracing::debug!(
            target: "gw.auth.jwt",
            alg = %token.header.alg,
            expected = ?context.algorithm,
            "Token algorithm does not match configured algorithm"
        );
        return Err(SignatureError::AlgorithmMismatch);
    }

    let mut validation = Validation::new(context.algorithm);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = context.clock_skew.as_secs();
    // aud / iss were already checked against the unverified claims
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Map<String, Value>>(token.raw, key, &validation).map_err(|e| {
        tracing::debug!(target: "gw.auth.jwt", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::ExpiredSignature => SignatureError::Expired,
            ErrorKind::ImmatureSignature => SignatureError::NotYetValid,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingAlgorithm
            | ErrorKind::InvalidAlgorithmName => SignatureError::AlgorithmMismatch,
            ErrorKind::InvalidSignature
            | ErrorKind::Base64(_)
            | ErrorKind::Crypto(_)
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => SignatureError::InvalidSignature,
            _ => SignatureError::Undecodable,
        }
    })?;

    let claims = Claims::from(token_data.claims);

    if let Some(iat) = claims.iat {
        if let Err(e) = validate_iat(iat, context.clock_skew) {
            tracing::debug!(target: "gw.auth.jwt", error = ?e, "Token iat validation failed");
            return Err(SignatureError::NotYetValid);
        }
    }

    Ok(claims)
}
