//! JWT claims and the audience / issuer checks.
//!
//! Contains the claims extracted from validated JWTs, the immutable
//! `ValidationContext` built from configuration at startup, and the claim
//! validator that runs against the unverified claim mapping before any key is
//! fetched. The `sub` field is redacted in Debug output to prevent exposure
//! in logs.
//!
//! `Claims` is built from the verified claim mapping rather than deserialized
//! into fixed types: a correctly signed token is never rejected because a
//! claim the gate does not check has an unusual JSON shape.

use crate::auth::error::ClaimError;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Expected values every accepted token must carry.
///
/// Built once at startup and shared read-only across concurrent validations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    /// Value that must be present in the `aud` claim.
    pub audience: String,

    /// Value the `iss` claim must equal.
    pub issuer: String,

    /// The only signing algorithm accepted.
    pub algorithm: Algorithm,

    /// Leeway for `exp`/`nbf` and the allowed future distance of `iat`.
    pub clock_skew: Duration,
}

/// The `aud` claim: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `expected` is one of the audiences.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

impl Audience {
    fn from_claim(aud: Option<Value>) -> Self {
        match aud {
            Some(Value::String(aud)) => Audience::Single(aud),
            Some(Value::Array(auds)) => Audience::Multiple(
                auds.into_iter()
                    .filter_map(|aud| match aud {
                        Value::String(aud) => Some(aud),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => Audience::Multiple(Vec::new()),
        }
    }
}

/// Claims of a token that passed the gate.
///
/// The `sub` field contains user identifiers which should not be exposed in
/// logs. A custom Debug implementation redacts this field.
#[derive(Clone, Serialize)]
pub struct Claims {
    /// Subject (user or client id) - redacted in Debug output.
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Audience(s).
    pub aud: Audience,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Space-separated scopes granted to this token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<Map<String, Value>> for Claims {
    /// Lenient conversion:
    /// - non-string `sub` is rendered as JSON text
    /// - `exp`/`nbf`/`iat` accept fractional NumericDates (rounded) and
    ///   ignore non-numeric values
    /// - a `scope` list is joined with spaces
    /// - non-string `aud` entries are dropped
    fn from(mut claims: Map<String, Value>) -> Self {
        let sub = match claims.remove("sub") {
            Some(Value::String(sub)) => sub,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let iss = match claims.remove("iss") {
            Some(Value::String(iss)) => iss,
            _ => String::new(),
        };
        let scope = match claims.remove("scope") {
            Some(Value::String(scope)) => Some(scope),
            Some(Value::Array(scopes)) => Some(
                scopes
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        };

        Self {
            sub,
            iss,
            aud: Audience::from_claim(claims.remove("aud")),
            exp: numeric_date(claims.get("exp")),
            nbf: numeric_date(claims.get("nbf")),
            iat: numeric_date(claims.get("iat")),
            scope,
        }
    }
}

/// Read a NumericDate claim, rounding fractional seconds.
fn numeric_date(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|secs| secs.is_finite())
            .map(|secs| secs.round() as i64)
    })
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Check the audience and issuer claims of an (unverified) claim mapping.
///
/// Audience is checked first. A missing claim, or one of the wrong JSON type,
/// fails the corresponding check.
///
/// # Errors
///
/// - `ClaimError::InvalidAudience` - `aud` does not contain the expected value
/// - `ClaimError::InvalidIssuer` - `iss` is not exactly the expected value
pub fn validate_claims(
    claims: &Map<String, Value>,
    context: &ValidationContext,
) -> Result<(), ClaimError> {
    if !audience_matches(claims.get("aud"), &context.audience) {
        tracing::debug!(target: "gw.auth.claims", "Token audience does not match");
        return Err(ClaimError::InvalidAudience);
    }

    let issuer_ok = matches!(claims.get("iss"), Some(Value::String(iss)) if *iss == context.issuer);
    if !issuer_ok {
        tracing::debug!(target: "gw.auth.claims", "Token issuer does not match");
        return Err(ClaimError::InvalidIssuer);
    }

    Ok(())
}

fn audience_matches(aud: Option<&Value>, expected: &str) -> bool {
    match aud {
        Some(Value::String(aud)) => aud == expected,
        Some(Value::Array(auds)) => auds
            .iter()
            .any(|aud| matches!(aud, Value::String(s) if s == expected)),
        _ => false,
    }
}
