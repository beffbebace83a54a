//! Product gateway configuration.
//!
//! Configuration is loaded once from environment variables at startup and is
//! immutable afterwards. Every value has a default matching the production
//! identity provider tenant, so an empty environment yields a working config.

use crate::auth::claims::ValidationContext;
use crate::auth::jwks::{
    JwksOptions, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_FETCH_TIMEOUT_SECONDS,
    DEFAULT_MIN_REFRESH_SECONDS,
};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default expected `aud` value.
pub const DEFAULT_AUDIENCE: &str = "https://thuocdongy.com/";

/// Default expected `iss` value.
pub const DEFAULT_ISSUER: &str = "https://dev--njhv5y3.au.auth0.com/";

/// Default JWKS endpoint of the identity provider.
pub const DEFAULT_JWKS_URL: &str = "https://dev--njhv5y3.au.auth0.com/.well-known/jwks.json";

/// Default directory holding the landing page.
pub const DEFAULT_VIEWS_DIR: &str = "./views";

/// Default directory holding static assets.
pub const DEFAULT_STATIC_DIR: &str = "./static";

/// Product gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Value that must appear in every token's `aud` claim.
    pub auth_audience: String,

    /// Value every token's `iss` claim must equal.
    pub auth_issuer: String,

    /// URL of the identity provider's JWKS document.
    pub jwks_url: String,

    /// The only accepted signing algorithm.
    pub jwt_algorithm: Algorithm,

    /// Clock skew tolerance in seconds for `exp`, `nbf` and `iat`.
    pub jwt_clock_skew_seconds: u64,

    /// How long a fetched key set is reused. 0 fetches on every validation.
    pub jwks_cache_ttl_seconds: u64,

    /// Timeout for one JWKS fetch.
    pub jwks_fetch_timeout_seconds: u64,

    /// Minimum age of the cached key set before an unknown `kid` forces a refetch.
    pub jwks_min_refresh_seconds: u64,

    /// Directory served at `/`.
    pub views_dir: PathBuf,

    /// Directory served under `/static/`.
    pub static_dir: PathBuf,

    /// Seconds to wait between a shutdown signal and stopping the listener.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Missing required value: {0}")]
    EmptyValue(String),

    #[error("Invalid JWKS URL: {0}")]
    InvalidJwksUrl(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidJwtAlgorithm(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache configuration: {0}")]
    InvalidJwksCache(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        if let Err(e) = bind_address.parse::<SocketAddr>() {
            return Err(ConfigError::InvalidBindAddress(format!(
                "BIND_ADDRESS must be a socket address, got '{}': {}",
                bind_address, e
            )));
        }

        let auth_audience = non_empty(vars, "AUTH_AUDIENCE", DEFAULT_AUDIENCE)?;
        let auth_issuer = non_empty(vars, "AUTH_ISSUER", DEFAULT_ISSUER)?;

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());

        match reqwest::Url::parse(&jwks_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => {
                return Err(ConfigError::InvalidJwksUrl(format!(
                    "JWKS_URL must be an http(s) URL, got scheme '{}'",
                    url.scheme()
                )));
            }
            Err(e) => {
                return Err(ConfigError::InvalidJwksUrl(format!(
                    "JWKS_URL must be an absolute URL, got '{}': {}",
                    jwks_url, e
                )));
            }
        }

        // Pinned algorithm; the provider signs with RSA
        let jwt_algorithm = match vars.get("JWT_ALGORITHM").map(String::as_str) {
            None | Some("RS256") => Algorithm::RS256,
            Some("RS384") => Algorithm::RS384,
            Some("RS512") => Algorithm::RS512,
            Some(other) => {
                return Err(ConfigError::InvalidJwtAlgorithm(format!(
                    "JWT_ALGORITHM must be one of RS256, RS384, RS512, got '{}'",
                    other
                )));
            }
        };

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            let value = value.unsigned_abs();
            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let jwks_cache_ttl_seconds =
            parse_seconds(vars, "JWKS_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)
                .map_err(ConfigError::InvalidJwksCache)?;

        let jwks_fetch_timeout_seconds =
            parse_seconds(vars, "JWKS_FETCH_TIMEOUT_SECONDS", DEFAULT_FETCH_TIMEOUT_SECONDS)
                .map_err(ConfigError::InvalidJwksCache)?;

        if jwks_fetch_timeout_seconds == 0 {
            return Err(ConfigError::InvalidJwksCache(
                "JWKS_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        let jwks_min_refresh_seconds =
            parse_seconds(vars, "JWKS_MIN_REFRESH_SECONDS", DEFAULT_MIN_REFRESH_SECONDS)
                .map_err(ConfigError::InvalidJwksCache)?;

        let views_dir = PathBuf::from(
            vars.get("VIEWS_DIR")
                .map(String::as_str)
                .unwrap_or(DEFAULT_VIEWS_DIR),
        );
        let static_dir = PathBuf::from(
            vars.get("STATIC_DIR")
                .map(String::as_str)
                .unwrap_or(DEFAULT_STATIC_DIR),
        );

        let drain_seconds =
            parse_seconds(vars, "DRAIN_SECONDS", 0).map_err(ConfigError::InvalidDrainPeriod)?;

        Ok(Config {
            bind_address,
            auth_audience,
            auth_issuer,
            jwks_url,
            jwt_algorithm,
            jwt_clock_skew_seconds,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_seconds,
            jwks_min_refresh_seconds,
            views_dir,
            static_dir,
            drain_seconds,
        })
    }

    /// The expected token values, fixed for the life of the process.
    pub fn validation_context(&self) -> ValidationContext {
        ValidationContext {
            audience: self.auth_audience.clone(),
            issuer: self.auth_issuer.clone(),
            algorithm: self.jwt_algorithm,
            clock_skew: Duration::from_secs(self.jwt_clock_skew_seconds),
        }
    }

    /// JWKS client settings.
    pub fn jwks_options(&self) -> JwksOptions {
        JwksOptions {
            cache_ttl: Duration::from_secs(self.jwks_cache_ttl_seconds),
            fetch_timeout: Duration::from_secs(self.jwks_fetch_timeout_seconds),
            min_refresh_interval: Duration::from_secs(self.jwks_min_refresh_seconds),
        }
    }
}

fn non_empty(
    vars: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let value = vars
        .get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string());

    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(format!("{} must not be empty", key)));
    }

    Ok(value)
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, String> {
    match vars.get(key) {
        Some(value_str) => value_str.parse().map_err(|e| {
            format!(
                "{} must be a valid non-negative integer, got '{}': {}",
                key, value_str, e
            )
        }),
        None => Ok(default),
    }
}
