//! Authentication failure taxonomy.
//!
//! Every variant is terminal for the request's authentication attempt and is
//! surfaced to clients as the same generic 401. The variants exist for
//! server-side diagnostics: each one has a bounded `reason()` label that is
//! safe to use in logs and metrics.

pub use common::jwt::TokenFormatError;
use thiserror::Error;

/// Audience / issuer check failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("invalid audience")]
    InvalidAudience,

    #[error("invalid issuer")]
    InvalidIssuer,
}

/// Failures while turning a `kid` into a verification key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyResolutionError {
    /// Connection failure, timeout or non-2xx status from the JWKS endpoint.
    #[error("key fetch failed: {0}")]
    FetchFailed(String),

    /// The JWKS endpoint answered with a body that is not a key set.
    #[error("malformed key set response: {0}")]
    MalformedResponse(String),

    #[error("no matching key")]
    NoMatchingKey,

    /// The matched record has no usable certificate, or it does not parse.
    #[error("malformed key material")]
    MalformedKey,
}

/// Failures raised by signature and temporal claim verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("expired token")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("algorithm mismatch")]
    AlgorithmMismatch,

    /// Signature checked out but the token content could not be decoded.
    #[error("undecodable token")]
    Undecodable,
}

/// Any reason the gate may reject a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` credential on the request.
    #[error("missing bearer credentials")]
    MissingCredentials,

    #[error("token format error: {0:?}")]
    Format(#[from] TokenFormatError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    KeyResolution(#[from] KeyResolutionError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl AuthError {
    /// Bounded label describing the failure, for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::Format(TokenFormatError::TokenTooLarge) => "token_too_large",
            AuthError::Format(TokenFormatError::MalformedToken) => "malformed_token",
            AuthError::Format(TokenFormatError::ClaimsNotAMapping) => "claims_not_a_mapping",
            AuthError::Claim(ClaimError::InvalidAudience) => "invalid_audience",
            AuthError::Claim(ClaimError::InvalidIssuer) => "invalid_issuer",
            AuthError::KeyResolution(KeyResolutionError::FetchFailed(_)) => "key_fetch_failed",
            AuthError::KeyResolution(KeyResolutionError::MalformedResponse(_)) => {
                "malformed_key_set"
            }
            AuthError::KeyResolution(KeyResolutionError::NoMatchingKey) => "no_matching_key",
            AuthError::KeyResolution(KeyResolutionError::MalformedKey) => "malformed_key",
            AuthError::Signature(SignatureError::InvalidSignature) => "invalid_signature",
            AuthError::Signature(SignatureError::Expired) => "expired_token",
            AuthError::Signature(SignatureError::NotYetValid) => "token_not_yet_valid",
            AuthError::Signature(SignatureError::AlgorithmMismatch) => "algorithm_mismatch",
            AuthError::Signature(SignatureError::Undecodable) => "undecodable_token",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_does_not_leak_detail_for_format_errors() {
        let err = AuthError::from(TokenFormatError::MalformedToken);
        assert_eq!(err.to_string(), "token format error: MalformedToken");
    }

    #[test]
    fn test_claim_errors_are_distinct() {
        assert_eq!(ClaimError::InvalidAudience.to_string(), "invalid audience");
        assert_eq!(ClaimError::InvalidIssuer.to_string(), "invalid issuer");
        assert_ne!(
            AuthError::from(ClaimError::InvalidAudience).reason(),
            AuthError::from(ClaimError::InvalidIssuer).reason()
        );
    }

    #[test]
    fn test_expiry_is_distinct_from_signature_failure() {
        assert_ne!(
            AuthError::from(SignatureError::Expired).reason(),
            AuthError::from(SignatureError::InvalidSignature).reason()
        );
    }

    #[test]
    fn test_reasons_are_snake_case_labels() {
        let errors = [
            AuthError::MissingCredentials,
            AuthError::from(TokenFormatError::TokenTooLarge),
            AuthError::from(KeyResolutionError::FetchFailed("timeout".to_string())),
            AuthError::from(KeyResolutionError::MalformedResponse("eof".to_string())),
            AuthError::from(KeyResolutionError::NoMatchingKey),
            AuthError::from(KeyResolutionError::MalformedKey),
            AuthError::from(SignatureError::NotYetValid),
            AuthError::from(SignatureError::AlgorithmMismatch),
            AuthError::from(SignatureError::Undecodable),
        ];

        for err in errors {
            let reason = err.reason();
            assert!(
                reason
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '_'),
                "{reason} is not a bounded snake_case label"
            );
        }
    }
}
