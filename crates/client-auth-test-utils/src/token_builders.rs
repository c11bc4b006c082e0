//! Builder for signed test client assertions.

use crate::crypto_fixtures::test_private_key_pkcs8;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use client_auth::config::DEFAULT_TOKEN_ENDPOINT_ALIAS;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for client assertions.
///
/// Defaults describe a valid private_key_jwt assertion at `now`:
/// `iss` and `sub` are the client id, `aud` is the default token endpoint
/// alias, `iat` is `now`, `exp` is five minutes later, `jti` is a fresh UUID.
///
/// # Example
/// ```rust,ignore
/// let assertion = TestAssertionBuilder::for_client("client123", test_now())
///     .audience("https://localhost:9443/oauth2/ciba")
///     .without_claim("iat")
///     .sign_ed25519(1);
/// ```
#[derive(Debug, Clone)]
pub struct TestAssertionBuilder {
    claims: Map<String, Value>,
}

impl TestAssertionBuilder {
    pub fn for_client(client_id: &str, now: DateTime<Utc>) -> Self {
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(client_id));
        claims.insert("sub".to_string(), json!(client_id));
        claims.insert("aud".to_string(), json!(DEFAULT_TOKEN_ENDPOINT_ALIAS));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::minutes(5)).timestamp()),
        );
        claims.insert("jti".to_string(), json!(uuid::Uuid::new_v4().to_string()));
        Self { claims }
    }

    pub fn issuer(self, iss: &str) -> Self {
        self.claim("iss", json!(iss))
    }

    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", json!(sub))
    }

    pub fn audience(self, aud: &str) -> Self {
        self.claim("aud", json!(aud))
    }

    pub fn jwt_id(self, jti: &str) -> Self {
        self.claim("jti", json!(jti))
    }

    pub fn expires_at(self, exp: DateTime<Utc>) -> Self {
        self.claim("exp", json!(exp.timestamp()))
    }

    pub fn issued_at(self, iat: DateTime<Utc>) -> Self {
        self.claim("iat", json!(iat.timestamp()))
    }

    pub fn not_before(self, nbf: DateTime<Utc>) -> Self {
        self.claim("nbf", json!(nbf.timestamp()))
    }

    /// Set any claim to any JSON value.
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// The claims as a JSON object.
    pub fn build(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with an Ed25519 PKCS#8 private key.
    pub fn sign(&self, private_key_pkcs8: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::EdDSA),
            &self.build(),
            &EncodingKey::from_ed_der(private_key_pkcs8),
        )
        .expect("test assertion should sign")
    }

    /// Sign with the deterministic fixture key for `seed`.
    pub fn sign_ed25519(&self, seed: u8) -> String {
        self.sign(&test_private_key_pkcs8(seed))
    }
}

/// Replace the JOSE header of a compact JWS, keeping payload and signature.
pub fn replace_header(token: &str, header_json: &str) -> String {
    let (_, rest) = token
        .split_once('.')
        .expect("token should have a header segment");
    format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), rest)
}
