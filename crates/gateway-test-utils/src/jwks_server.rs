//! Mock identity provider JWKS endpoint.

use crate::keys::{jwks_document, TestSigningKey};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the identity provider publishes its key set at.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A wiremock server answering `GET /.well-known/jwks.json`.
///
/// The response can be swapped mid-test to simulate key rotation or an
/// outage. Requests are recorded so tests can count fetches; swapping the
/// response starts a fresh count.
pub struct TestJwksServer {
    mock_server: MockServer,
}

impl TestJwksServer {
    /// Start a server publishing `keys`.
    pub async fn start(keys: &[&TestSigningKey]) -> Self {
        Self::start_with_document(jwks_document(keys)).await
    }

    /// Start a server publishing an arbitrary JSON document.
    pub async fn start_with_document(document: Value) -> Self {
        let server = Self {
            mock_server: MockServer::start().await,
        };
        server.serve_document(document).await;
        server
    }

    /// Full URL of the JWKS document.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.mock_server.uri(), JWKS_PATH)
    }

    /// Replace the published key set.
    pub async fn serve_keys(&self, keys: &[&TestSigningKey]) {
        self.serve_document(jwks_document(keys)).await;
    }

    /// Replace the response with an arbitrary JSON document.
    pub async fn serve_document(&self, document: Value) {
        self.mount(ResponseTemplate::new(200).set_body_json(document))
            .await;
    }

    /// Replace the response with a raw body (e.g. invalid JSON).
    pub async fn serve_raw(&self, body: &str) {
        self.mount(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(body),
        )
        .await;
    }

    /// Replace the response with an empty body and the given status.
    pub async fn serve_status(&self, status: u16) {
        self.mount(ResponseTemplate::new(status)).await;
    }

    /// Publish `keys`, but only after `delay`.
    pub async fn serve_keys_slowly(&self, keys: &[&TestSigningKey], delay: Duration) {
        self.mount(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(keys))
                .set_delay(delay),
        )
        .await;
    }

    /// Number of JWKS requests received since the response was last set.
    pub async fn fetch_count(&self) -> usize {
        self.mock_server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|request| request.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }

    async fn mount(&self, response: ResponseTemplate) {
        // Drops earlier mocks and the request journal
        self.mock_server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.mock_server)
            .await;
    }
}
