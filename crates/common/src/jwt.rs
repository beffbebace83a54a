//! JWT utilities shared across the gateway.
//!
//! This module provides the transport-independent parts of token handling:
//! - Size limits for DoS prevention
//! - Clock skew constants for temporal claim validation
//! - Unverified decoding of the header (`alg`, `kid`) and the claim mapping
//! - iat validation logic
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing decoded here is trusted: the header and claims are only used to
//!   select a key and to run cheap claim checks ahead of signature verification
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{validate_iat, UnverifiedToken, DEFAULT_CLOCK_SKEW};
//!
//! let unverified = UnverifiedToken::parse(token)?;
//! let kid = unverified.header.kid.as_deref();
//!
//! // After signature verification, validate iat
//! validate_iat(iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations.
///
/// # Rationale
///
/// - Typical identity provider access tokens are 700-1500 bytes (RS256 signature
///   plus audience list and scopes)
/// - 8KB leaves room for large custom claim sets while bounding the work done
///   on attacker-supplied input
/// - Checked BEFORE base64 decode for efficiency
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Applied as leeway to `exp` and `nbf`, and as the maximum distance an `iat`
/// timestamp may lie in the future.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// This prevents misconfiguration that could weaken security by allowing
/// excessively large clock skew tolerance.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while reading a token before its signature is checked.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenFormatError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not a three-part JWS compact serialization, or a part
    /// is not valid base64url / JSON.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token payload decoded but is not a JSON object.
    #[error("The access token is invalid or expired")]
    ClaimsNotAMapping,
}

/// Errors raised by temporal claim helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalClaimError {
    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Unverified token
// =============================================================================

/// JOSE header fields the gateway looks at.
///
/// `alg` is kept as the raw string so that values the JWT library does not
/// know (for example `none`) can still be reported as an algorithm mismatch
/// instead of a parse failure.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signing algorithm.
    pub alg: String,

    /// Key ID used to select the verification key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Token type, usually "JWT".
    #[serde(default)]
    pub typ: Option<String>,
}

/// A token split into its decoded header and claim mapping.
///
/// Produced without any signature check. Lifetime is a single request.
#[derive(Debug, Clone)]
pub struct UnverifiedToken<'a> {
    /// The compact serialization as received.
    pub raw: &'a str,

    /// Decoded JOSE header.
    pub header: TokenHeader,

    /// Decoded claim set.
    pub claims: Map<String, Value>,
}

impl<'a> UnverifiedToken<'a> {
    /// Decode the header and claims of a JWT without verifying the signature.
    ///
    /// # Security
    ///
    /// - Token size is checked BEFORE any parsing (denial-of-service prevention)
    /// - The result MUST still be verified against a trusted key before the
    ///   token is accepted
    ///
    /// # Errors
    ///
    /// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
    /// - `MalformedToken` - Wrong structure, bad base64, invalid JSON header
    /// - `ClaimsNotAMapping` - Payload is valid JSON but not an object
    pub fn parse(token: &'a str) -> Result<Self, TokenFormatError> {
        // Check token size first (DoS prevention)
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenFormatError::TokenTooLarge);
        }

        // JWT format: header.payload.signature
        let parts: Vec<&str> = token.split('.').collect();
        let [header_part, payload_part, _signature] = parts.as_slice() else {
            tracing::debug!(
                target: "common.jwt",
                parts = parts.len(),
                "Token rejected: invalid JWT format"
            );
            return Err(TokenFormatError::MalformedToken);
        };

        let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
            TokenFormatError::MalformedToken
        })?;

        let header: TokenHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
            TokenFormatError::MalformedToken
        })?;

        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
            TokenFormatError::MalformedToken
        })?;

        let payload: Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT payload JSON");
            TokenFormatError::MalformedToken
        })?;

        let Value::Object(claims) = payload else {
            tracing::debug!(target: "common.jwt", "Token rejected: claims are not a JSON object");
            return Err(TokenFormatError::ClaimsNotAMapping);
        };

        Ok(Self {
            raw: token,
            header,
            claims,
        })
    }

    /// The `kid` header value, treating an empty string as absent.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref().filter(|kid| !kid.is_empty())
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens with `iat` too far in the future, which could indicate:
/// - Token pre-generation attack
/// - Clock synchronization issues
/// - Token manipulation
///
/// # Errors
///
/// Returns `TemporalClaimError::IatTooFarInFuture` if the iat timestamp is more
/// than `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), TemporalClaimError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// Prefer [`validate_iat`] in production code. This variant exists so that
/// boundary conditions can be unit-tested without wall-clock dependence.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), TemporalClaimError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds), well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(TemporalClaimError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
