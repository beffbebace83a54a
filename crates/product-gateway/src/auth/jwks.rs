//! JWKS client for fetching and caching the identity provider's public keys.
//!
//! The JWKS (JSON Web Key Set) client fetches the provider's
//! `/.well-known/jwks.json` document and keeps the most recent key set as a
//! shared snapshot with a configurable TTL.
//!
//! # Security
//!
//! - Every fetch is bounded by a timeout; a failed fetch is an error value,
//!   never a panic
//! - Unknown key IDs trigger a refetch at most once per minimum refresh
//!   interval, so random `kid` values cannot turn into a request flood
//!   against the provider
//! - Concurrent refreshes are collapsed: callers queue on a refresh lock and
//!   reuse a key set fetched after they started waiting
//! - HTTPS should be used in production (enforced by deployment config)

use crate::auth::error::KeyResolutionError;
use crate::observability::metrics::record_jwks_fetch;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default timeout for a single JWKS fetch in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default minimum age of the cached set before an unknown `kid` forces a refetch.
pub const DEFAULT_MIN_REFRESH_SECONDS: u64 = 30;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for the provider's signing keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: String,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Certificate chain, leaf first, each entry standard base64 DER.
    #[serde(default)]
    pub x5c: Vec<String>,

    /// SHA-1 thumbprint of the leaf certificate.
    #[serde(default)]
    pub x5t: Option<String>,
}

/// Key set document as published by the identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeySet {
    /// Key records, in the order the provider published them.
    pub keys: Vec<Jwk>,
}

impl KeySet {
    /// First record whose key ID equals `kid`.
    ///
    /// Providers publish unique key IDs, but nothing in the document format
    /// prevents duplicates; sequence order decides.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    /// Leaf certificate (first `x5c` entry) of the key matching `kid`.
    ///
    /// # Errors
    ///
    /// - `NoMatchingKey` - no record carries this key ID
    /// - `MalformedKey` - the record has an empty certificate chain
    pub fn certificate_for(&self, kid: &str) -> Result<&str, KeyResolutionError> {
        let jwk = self.find(kid).ok_or(KeyResolutionError::NoMatchingKey)?;

        jwk.x5c.first().map(String::as_str).ok_or_else(|| {
            tracing::warn!(target: "gw.auth.jwks", kid = %kid, "JWK has no x5c certificate chain");
            KeyResolutionError::MalformedKey
        })
    }
}

/// Source of verification certificates, looked up by key ID.
///
/// Implemented by [`JwksClient`]; the seam lets the gate be exercised with
/// in-memory key sets.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Return the base64 DER leaf certificate of the key with this ID.
    async fn certificate_for(&self, kid: &str) -> Result<String, KeyResolutionError>;
}

/// Tuning knobs for [`JwksClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JwksOptions {
    /// How long a fetched key set is served without refetching.
    /// Zero disables caching: every validation fetches.
    pub cache_ttl: Duration,

    /// Upper bound on a single fetch (connect + response).
    pub fetch_timeout: Duration,

    /// Minimum age of the cached set before an unknown `kid` triggers a refetch.
    pub min_refresh_interval: Duration,
}

impl Default for JwksOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
            min_refresh_interval: Duration::from_secs(DEFAULT_MIN_REFRESH_SECONDS),
        }
    }
}

/// Cached key set with the time it was fetched.
struct CachedJwks {
    key_set: Arc<KeySet>,
    fetched_at: Instant,
}

/// JWKS client for fetching and caching public keys.
///
/// Thread-safe: concurrent validations share the snapshot through a read
/// lock; a refresh swaps in a new snapshot under a short write lock. At most
/// one fetch is in flight per client.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Most recent key set.
    cache: RwLock<Option<CachedJwks>>,

    /// Held for the duration of a refresh.
    refresh_lock: Mutex<()>,

    options: JwksOptions,
}

impl JwksClient {
    /// Create a new JWKS client with default options.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the identity provider's JWKS endpoint
    pub fn new(jwks_url: String) -> Self {
        Self::with_options(jwks_url, JwksOptions::default())
    }

    /// Create a new JWKS client with explicit cache and timeout settings.
    pub fn with_options(jwks_url: String, options: JwksOptions) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(options.fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gw.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            options,
        }
    }

    /// The configured JWKS endpoint.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// The configured cache and timeout settings.
    pub fn options(&self) -> JwksOptions {
        self.options
    }

    /// Fetch the key set from the provider, bypassing the cache.
    ///
    /// The response body is read in full and released before parsing
    /// returns. Dropping the returned future cancels the request.
    ///
    /// # Errors
    ///
    /// - `FetchFailed` - connection error, timeout or non-2xx status
    /// - `MalformedResponse` - the body is not a JWKS document
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn fetch_key_set(&self) -> Result<KeySet, KeyResolutionError> {
        let start = Instant::now();
        let result = self.fetch_key_set_inner().await;

        let status = match &result {
            Ok(_) => "success",
            Err(KeyResolutionError::MalformedResponse(_)) => "malformed",
            Err(_) => "error",
        };
        record_jwks_fetch(status, start.elapsed());

        result
    }

    async fn fetch_key_set_inner(&self) -> Result<KeySet, KeyResolutionError> {
        tracing::debug!(target: "gw.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .timeout(self.options.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gw.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeyResolutionError::FetchFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "gw.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeyResolutionError::FetchFailed(format!(
                "unexpected status {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "gw.auth.jwks", error = %e, "Failed to read JWKS response body");
            KeyResolutionError::FetchFailed(e.to_string())
        })?;

        serde_json::from_slice::<KeySet>(&body).map_err(|e| {
            tracing::error!(target: "gw.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeyResolutionError::MalformedResponse(e.to_string())
        })
    }

    /// Get the key set to resolve `kid` against.
    ///
    /// Serves the cached snapshot while it is fresh and either contains `kid`
    /// or is younger than the minimum refresh interval; otherwise refetches.
    async fn key_set_for(&self, kid: &str) -> Result<Arc<KeySet>, KeyResolutionError> {
        let requested_at = Instant::now();
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < self.options.cache_ttl {
                    if cached.key_set.find(kid).is_some() {
                        tracing::debug!(target: "gw.auth.jwks", kid = %kid, "JWKS cache hit");
                        return Ok(Arc::clone(&cached.key_set));
                    }
                    if age < self.options.min_refresh_interval {
                        tracing::debug!(target: "gw.auth.jwks", kid = %kid, "Key not found in recently refreshed JWKS cache");
                        return Ok(Arc::clone(&cached.key_set));
                    }
                    tracing::debug!(target: "gw.auth.jwks", kid = %kid, "Key not found in JWKS cache, refreshing");
                }
            }
        }

        self.refresh_cache(requested_at).await
    }

    /// Fetch a fresh key set and swap it into the cache.
    ///
    /// A key set stored after `requested_at` by a refresh that held the lock
    /// first is returned as is, so waiters share one fetch.
    async fn refresh_cache(
        &self,
        requested_at: Instant,
    ) -> Result<Arc<KeySet>, KeyResolutionError> {
        let _refresh = self.refresh_lock.lock().await;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at >= requested_at {
                    tracing::debug!(target: "gw.auth.jwks", "JWKS refreshed by a concurrent request");
                    return Ok(Arc::clone(&cached.key_set));
                }
            }
        }

        let key_set = Arc::new(self.fetch_key_set().await?);

        tracing::info!(
            target: "gw.auth.jwks",
            key_count = key_set.keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            key_set: Arc::clone(&key_set),
            fetched_at: Instant::now(),
        });

        Ok(key_set)
    }

    /// Make sure a key set is loaded, fetching if the cache is empty or stale.
    ///
    /// Returns the number of keys available. Used by the readiness probe.
    pub async fn ensure_loaded(&self) -> Result<usize, KeyResolutionError> {
        let requested_at = Instant::now();
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.options.cache_ttl {
                    return Ok(cached.key_set.keys.len());
                }
            }
        }

        Ok(self.refresh_cache(requested_at).await?.keys.len())
    }

    /// Drop the cached key set so the next lookup refetches.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[async_trait]
impl KeySource for JwksClient {
    #[instrument(skip(self), fields(kid = %kid))]
    async fn certificate_for(&self, kid: &str) -> Result<String, KeyResolutionError> {
        let key_set = self.key_set_for(kid).await?;

        key_set
            .certificate_for(kid)
            .map(ToString::to_string)
            .inspect_err(|e| {
                tracing::debug!(target: "gw.auth.jwks", kid = %kid, error = %e, "Key resolution failed");
            })
    }
}
