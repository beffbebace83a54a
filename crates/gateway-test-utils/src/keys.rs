//! RSA signing keys for tests.
//!
//! Two fixed 2048-bit key pairs with self-signed certificates live in
//! `fixtures/`. Tokens signed here verify against the `x5c` entry published
//! by [`TestSigningKey::jwk`].

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};

const KEY_01_PRIVATE: &str = include_str!("../fixtures/signing-key-01.key.pem");
const KEY_01_CERTIFICATE: &str = include_str!("../fixtures/signing-key-01.crt.pem");
const KEY_02_PRIVATE: &str = include_str!("../fixtures/signing-key-02.key.pem");
const KEY_02_CERTIFICATE: &str = include_str!("../fixtures/signing-key-02.crt.pem");

/// An RSA key pair with a key ID, able to sign tokens and describe itself as a JWK.
#[derive(Debug, Clone)]
pub struct TestSigningKey {
    kid: String,
    private_pem: &'static str,
    certificate_pem: &'static str,
}

impl TestSigningKey {
    /// The first fixture key, kid `test-key-01`.
    pub fn primary() -> Self {
        Self {
            kid: "test-key-01".to_string(),
            private_pem: KEY_01_PRIVATE,
            certificate_pem: KEY_01_CERTIFICATE,
        }
    }

    /// The second fixture key, kid `test-key-02`.
    pub fn secondary() -> Self {
        Self {
            kid: "test-key-02".to_string(),
            private_pem: KEY_02_PRIVATE,
            certificate_pem: KEY_02_CERTIFICATE,
        }
    }

    /// Same key material under a different key ID.
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = kid.to_string();
        self
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The certificate as a JWKS `x5c` entry: base64 DER, no armour, no newlines.
    pub fn certificate_x5c(&self) -> String {
        self.certificate_pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .map(str::trim)
            .collect()
    }

    /// JWK record as the identity provider publishes it.
    pub fn jwk(&self) -> Value {
        json!({
            "alg": "RS256",
            "kty": "RSA",
            "use": "sig",
            "kid": self.kid,
            "x5c": [self.certificate_x5c()]
        })
    }

    /// Sign `claims` with RS256 and this key's `kid`.
    pub fn sign<T: Serialize>(&self, claims: &T) -> String {
        self.sign_with_alg(claims, Algorithm::RS256)
    }

    /// Sign `claims` with another RSA algorithm (RS256/RS384/RS512, PS*).
    pub fn sign_with_alg<T: Serialize>(&self, claims: &T, alg: Algorithm) -> String {
        let mut header = Header::new(alg);
        header.kid = Some(self.kid.clone());
        self.sign_with_header(claims, &header)
    }

    /// Sign `claims` with a caller-built header, e.g. one without a `kid`.
    pub fn sign_with_header<T: Serialize>(&self, claims: &T, header: &Header) -> String {
        let encoding_key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .expect("fixture private key should parse");
        encode(header, claims, &encoding_key).expect("Failed to sign token")
    }

    /// Sign `claims` with HS256 using the public certificate as the shared
    /// secret, the classic algorithm-confusion forgery.
    pub fn forge_hs256<T: Serialize>(&self, claims: &T) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.kid.clone());
        let encoding_key = EncodingKey::from_secret(self.certificate_pem.as_bytes());
        encode(&header, claims, &encoding_key).expect("Failed to sign token")
    }
}

/// A JWKS document containing `keys`, in order.
pub fn jwks_document(keys: &[&TestSigningKey]) -> Value {
    json!({
        "keys": keys.iter().map(|key| key.jwk()).collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x5c_has_no_armour_or_whitespace() {
        let x5c = TestSigningKey::primary().certificate_x5c();
        assert!(x5c.starts_with("MII"));
        assert!(!x5c.contains('-'));
        assert!(!x5c.contains('\n'));
    }

    #[test]
    fn test_fixture_keys_differ() {
        assert_ne!(
            TestSigningKey::primary().certificate_x5c(),
            TestSigningKey::secondary().certificate_x5c()
        );
    }

    #[test]
    fn test_jwks_document_keeps_order() {
        let primary = TestSigningKey::primary();
        let secondary = TestSigningKey::secondary();
        let doc = jwks_document(&[&secondary, &primary]);

        assert_eq!(doc["keys"][0]["kid"], "test-key-02");
        assert_eq!(doc["keys"][1]["kid"], "test-key-01");
    }

    #[test]
    fn test_sign_sets_kid_and_alg() {
        let token = TestSigningKey::primary().sign_with_alg(&json!({"sub": "x"}), Algorithm::RS384);
        let header = jsonwebtoken::decode_header(&token).unwrap();

        assert_eq!(header.alg, Algorithm::RS384);
        assert_eq!(header.kid.as_deref(), Some("test-key-01"));
    }
}
