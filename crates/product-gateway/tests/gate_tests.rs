//! Token gate tests against a live JWKS endpoint.
//!
//! Each rejection carries the last stage reached and a reason label; these
//! tests pin both for every failure class.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use gateway_test_utils::{TestClaims, TestJwksServer, TestSigningKey, TEST_AUDIENCE, TEST_ISSUER};
use jsonwebtoken::{Algorithm, Header};
use product_gateway::auth::claims::Audience;
use product_gateway::auth::error::{
    AuthError, ClaimError, KeyResolutionError, SignatureError, TokenFormatError,
};
use product_gateway::auth::{
    Gate, GateRejection, GateStage, JwksClient, JwksOptions, KeySource, ValidationContext,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn context() -> ValidationContext {
    ValidationContext {
        audience: TEST_AUDIENCE.to_string(),
        issuer: TEST_ISSUER.to_string(),
        algorithm: Algorithm::RS256,
        clock_skew: Duration::from_secs(60),
    }
}

fn gate_for(jwks: &TestJwksServer) -> Gate {
    let client: Arc<dyn KeySource> = Arc::new(JwksClient::with_options(
        jwks.jwks_url(),
        JwksOptions {
            fetch_timeout: Duration::from_secs(2),
            ..JwksOptions::default()
        },
    ));
    Gate::new(Arc::new(context()), client)
}

fn assert_rejected(
    result: Result<impl std::fmt::Debug, GateRejection>,
    stage: GateStage,
    reason: AuthError,
) {
    let rejection = result.expect_err("token should be rejected");
    assert_eq!(rejection.stage, stage, "unexpected stage for {reason:?}");
    assert_eq!(rejection.reason, reason);
}

#[tokio::test]
async fn test_valid_token_allowed_with_claims() -> Result<()> {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    let claims = gate.check(&key.sign(&TestClaims::valid())).await?;

    assert_eq!(claims.sub, "auth0|test-user");
    assert_eq!(claims.iss, TEST_ISSUER);
    assert_eq!(claims.aud, Audience::Single(TEST_AUDIENCE.to_string()));
    assert_eq!(claims.scope.as_deref(), Some("read:products write:feedback"));

    Ok(())
}

#[tokio::test]
async fn test_format_failures_stop_at_received() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    assert_rejected(
        gate.check(&"x".repeat(9000)).await,
        GateStage::Received,
        TokenFormatError::TokenTooLarge.into(),
    );
    assert_rejected(
        gate.check("two.parts").await,
        GateStage::Received,
        TokenFormatError::MalformedToken.into(),
    );
    assert_eq!(jwks.fetch_count().await, 0);
}

#[tokio::test]
async fn test_claim_failures_stop_at_received() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    assert_rejected(
        gate.check(&key.sign(&TestClaims::valid().with_audience("https://other/")))
            .await,
        GateStage::Received,
        ClaimError::InvalidAudience.into(),
    );
    assert_rejected(
        gate.check(&key.sign(&TestClaims::valid().without_audience()))
            .await,
        GateStage::Received,
        ClaimError::InvalidAudience.into(),
    );
    assert_rejected(
        gate.check(&key.sign(&TestClaims::valid().with_issuer("https://other/")))
            .await,
        GateStage::Received,
        ClaimError::InvalidIssuer.into(),
    );
    assert_eq!(jwks.fetch_count().await, 0);
}

#[tokio::test]
async fn test_audience_checked_before_issuer() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    let claims = TestClaims::valid()
        .with_audience("https://other/")
        .with_issuer("https://other/");

    assert_rejected(
        gate.check(&key.sign(&claims)).await,
        GateStage::Received,
        ClaimError::InvalidAudience.into(),
    );
}

#[tokio::test]
async fn test_key_failures_stop_at_claims_checked() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    // Unknown kid
    assert_rejected(
        gate.check(&TestSigningKey::secondary().sign(&TestClaims::valid()))
            .await,
        GateStage::ClaimsChecked,
        KeyResolutionError::NoMatchingKey.into(),
    );

    // No kid at all
    let no_kid = key.sign_with_header(&TestClaims::valid(), &Header::new(Algorithm::RS256));
    assert_rejected(
        gate.check(&no_kid).await,
        GateStage::ClaimsChecked,
        KeyResolutionError::NoMatchingKey.into(),
    );

    // Empty kid counts as absent
    let mut empty_kid = Header::new(Algorithm::RS256);
    empty_kid.kid = Some(String::new());
    assert_rejected(
        gate.check(&key.sign_with_header(&TestClaims::valid(), &empty_kid))
            .await,
        GateStage::ClaimsChecked,
        KeyResolutionError::NoMatchingKey.into(),
    );
}

#[tokio::test]
async fn test_unreachable_provider_is_fetch_failure() {
    let gate = Gate::new(
        Arc::new(context()),
        Arc::new(JwksClient::new(
            "http://127.0.0.1:1/.well-known/jwks.json".to_string(),
        )),
    );
    let token = TestSigningKey::primary().sign(&TestClaims::valid());

    let rejection = gate.check(&token).await.unwrap_err();

    assert_eq!(rejection.stage, GateStage::ClaimsChecked);
    assert!(matches!(
        rejection.reason,
        AuthError::KeyResolution(KeyResolutionError::FetchFailed(_))
    ));
    assert_eq!(rejection.reason.reason(), "key_fetch_failed");
}

#[tokio::test]
async fn test_malformed_documents() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let token = key.sign(&TestClaims::valid());

    jwks.serve_raw("<html>not json</html>").await;
    let rejection = gate_for(&jwks).check(&token).await.unwrap_err();
    assert_eq!(rejection.stage, GateStage::ClaimsChecked);
    assert_eq!(rejection.reason.reason(), "malformed_key_set");

    jwks.serve_document(json!({"keys": [{"kty": "RSA", "kid": key.kid()}]}))
        .await;
    assert_rejected(
        gate_for(&jwks).check(&token).await,
        GateStage::ClaimsChecked,
        KeyResolutionError::MalformedKey.into(),
    );

    jwks.serve_document(json!({"keys": [{"kty": "RSA", "kid": key.kid(), "x5c": ["bm90IGEgY2VydA=="]}]}))
        .await;
    assert_rejected(
        gate_for(&jwks).check(&token).await,
        GateStage::ClaimsChecked,
        KeyResolutionError::MalformedKey.into(),
    );
}

#[tokio::test]
async fn test_signature_failures_stop_at_key_resolved() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    let impostor = TestSigningKey::secondary().with_kid(key.kid());
    assert_rejected(
        gate.check(&impostor.sign(&TestClaims::valid())).await,
        GateStage::KeyResolved,
        SignatureError::InvalidSignature.into(),
    );

    assert_rejected(
        gate.check(&key.sign(&TestClaims::expired())).await,
        GateStage::KeyResolved,
        SignatureError::Expired.into(),
    );

    assert_rejected(
        gate.check(&key.sign(&TestClaims::not_yet_valid())).await,
        GateStage::KeyResolved,
        SignatureError::NotYetValid.into(),
    );

    assert_rejected(
        gate.check(&key.sign(&TestClaims::issued_in_future())).await,
        GateStage::KeyResolved,
        SignatureError::NotYetValid.into(),
    );

    assert_rejected(
        gate.check(&key.sign_with_alg(&TestClaims::valid(), Algorithm::RS512))
            .await,
        GateStage::KeyResolved,
        SignatureError::AlgorithmMismatch.into(),
    );

    assert_rejected(
        gate.check(&key.forge_hs256(&TestClaims::valid())).await,
        GateStage::KeyResolved,
        SignatureError::AlgorithmMismatch.into(),
    );
}

#[tokio::test]
async fn test_tampered_payload_fails_signature() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    let token = key.sign(&TestClaims::valid());
    let (header, rest) = token.split_once('.').unwrap();
    let (_, signature) = rest.split_once('.').unwrap();
    let mut claims = TestClaims::valid();
    claims.sub = "auth0|admin".to_string();
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let tampered = format!("{header}.{forged_payload}.{signature}");

    assert_rejected(
        gate.check(&tampered).await,
        GateStage::KeyResolved,
        SignatureError::InvalidSignature.into(),
    );
}

#[tokio::test]
async fn test_first_matching_key_wins_on_duplicate_kid() -> Result<()> {
    let key = TestSigningKey::primary();
    let duplicate = TestSigningKey::secondary().with_kid(key.kid());

    // Real key published first: accepted
    let jwks = TestJwksServer::start(&[&key, &duplicate]).await;
    gate_for(&jwks).check(&key.sign(&TestClaims::valid())).await?;

    // Real key published second: the first record is used and fails
    jwks.serve_keys(&[&duplicate, &key]).await;
    assert_rejected(
        gate_for(&jwks).check(&key.sign(&TestClaims::valid())).await,
        GateStage::KeyResolved,
        SignatureError::InvalidSignature.into(),
    );

    Ok(())
}

#[tokio::test]
async fn test_rejection_display_names_stage() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);

    let rejection = gate
        .check(&key.sign(&TestClaims::expired()))
        .await
        .unwrap_err();

    assert_eq!(rejection.to_string(), "rejected at key_resolved: expired token");
}

#[tokio::test]
async fn test_signed_tokens_with_unusual_claim_shapes_allowed() -> Result<()> {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);
    let now = chrono::Utc::now().timestamp();

    let base = || {
        json!({
            "sub": "auth0|test-user",
            "iss": TEST_ISSUER,
            "aud": TEST_AUDIENCE,
            "exp": now + 3600,
            "iat": now,
        })
    };
    let with = |field: &str, value: serde_json::Value| {
        let mut claims = base();
        claims[field] = value;
        claims
    };

    let fractional = gate
        .check(&key.sign(&with("exp", json!(now as f64 + 3600.5))))
        .await?;
    assert_eq!(fractional.exp, Some(now + 3601));

    let scope_list = gate
        .check(&key.sign(&with("scope", json!(["read:products", "write:feedback"]))))
        .await?;
    assert_eq!(
        scope_list.scope.as_deref(),
        Some("read:products write:feedback")
    );

    let numeric_sub = gate.check(&key.sign(&with("sub", json!(42)))).await?;
    assert_eq!(numeric_sub.sub, "42");

    let fractional_iat = gate
        .check(&key.sign(&with("iat", json!(now as f64 - 0.25))))
        .await?;
    assert_eq!(fractional_iat.iat, Some(now));

    let mixed_audience = gate
        .check(&key.sign(&with("aud", json!([7, TEST_AUDIENCE]))))
        .await?;
    assert!(mixed_audience.aud.contains(TEST_AUDIENCE));

    Ok(())
}

#[tokio::test]
async fn test_fractional_exp_in_the_past_is_expired() {
    let key = TestSigningKey::primary();
    let jwks = TestJwksServer::start(&[&key]).await;
    let gate = gate_for(&jwks);
    let now = chrono::Utc::now().timestamp() as f64;

    let claims = json!({
        "iss": TEST_ISSUER,
        "aud": TEST_AUDIENCE,
        "exp": now - 3600.5,
    });

    assert_rejected(
        gate.check(&key.sign(&claims)).await,
        GateStage::KeyResolved,
        SignatureError::Expired.into(),
    );
}
