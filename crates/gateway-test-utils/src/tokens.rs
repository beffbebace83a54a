//! Claim sets for test tokens.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Audience the test gateway expects.
pub const TEST_AUDIENCE: &str = "https://thuocdongy.com/";

/// Issuer the test gateway expects.
pub const TEST_ISSUER: &str = "https://dev--njhv5y3.au.auth0.com/";

/// Claims for test tokens. `None` fields are left out of the token.
#[derive(Debug, Clone, Serialize)]
pub struct TestClaims {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TestClaims {
    /// Claims the gateway accepts: expected audience and issuer, valid for an hour.
    pub fn valid() -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: "auth0|test-user".to_string(),
            iss: Some(TEST_ISSUER.to_string()),
            aud: Some(Value::String(TEST_AUDIENCE.to_string())),
            exp: Some(now + 3600),
            nbf: None,
            iat: Some(now),
            scope: Some("read:products write:feedback".to_string()),
        }
    }

    /// Valid claims that expired an hour ago (well outside any clock skew).
    pub fn expired() -> Self {
        let now = Utc::now().timestamp();
        Self {
            exp: Some(now - 3600),
            iat: Some(now - 7200),
            ..Self::valid()
        }
    }

    /// Valid claims whose `nbf` is an hour ahead.
    pub fn not_yet_valid() -> Self {
        let now = Utc::now().timestamp();
        Self {
            nbf: Some(now + 3600),
            exp: Some(now + 7200),
            ..Self::valid()
        }
    }

    /// Valid claims whose `iat` is an hour ahead.
    pub fn issued_in_future() -> Self {
        let now = Utc::now().timestamp();
        Self {
            iat: Some(now + 3600),
            exp: Some(now + 7200),
            ..Self::valid()
        }
    }

    pub fn with_audience(mut self, aud: impl Into<Value>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    pub fn without_audience(mut self) -> Self {
        self.aud = None;
        self
    }

    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    pub fn without_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    pub fn without_exp(mut self) -> Self {
        self.exp = None;
        self
    }
}
