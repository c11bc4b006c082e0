//! Client public key resolution.
//!
//! Each registered client has one verification key and the algorithm(s) it
//! may sign with. The validator resolves the key from the assertion's
//! `sub` (falling back to `iss`), then refuses any header `alg` outside the
//! key's allowed set before verifying the signature.

use common::jwt::decode_ed25519_public_key_pem;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Length of a raw Ed25519 public key.
const ED25519_PUBLIC_KEY_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyResolutionError {
    #[error("No key registered for client")]
    UnknownClient,

    #[error("Assertion names no client")]
    NoClientIdentifier,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),

    #[error("Failed to load client keys: {0}")]
    Load(String),
}

/// A client's verification key.
#[derive(Clone)]
pub struct ClientKey {
    key: DecodingKey,
    algorithms: Vec<Algorithm>,
}

impl ClientKey {
    /// Build a key from its PEM form.
    ///
    /// EdDSA keys use the base64-wrapped raw 32-byte encoding; RSA and EC keys
    /// use standard PEM. Symmetric (HS*) algorithms are not accepted for
    /// client assertions.
    pub fn from_pem(alg: Algorithm, pem: &str) -> Result<Self, KeyResolutionError> {
        let key = match alg {
            Algorithm::EdDSA => {
                let raw = decode_ed25519_public_key_pem(pem)
                    .map_err(|e| KeyResolutionError::InvalidKey(e.to_string()))?;
                if raw.len() != ED25519_PUBLIC_KEY_LEN {
                    return Err(KeyResolutionError::InvalidKey(format!(
                        "Ed25519 public key must be {} bytes, got {}",
                        ED25519_PUBLIC_KEY_LEN,
                        raw.len()
                    )));
                }
                DecodingKey::from_ed_der(&raw)
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| KeyResolutionError::InvalidKey(e.to_string()))?,
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem.as_bytes())
                .map_err(|e| KeyResolutionError::InvalidKey(e.to_string()))?,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Err(KeyResolutionError::UnsupportedAlgorithm(alg));
            }
        };

        Ok(Self {
            key,
            algorithms: vec![alg],
        })
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Whether this key may verify a signature made with `alg`.
    pub fn allows(&self, alg: Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }
}

impl fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientKey")
            .field("key", &"[PUBLIC KEY]")
            .field("algorithms", &self.algorithms)
            .finish()
    }
}

/// Source of client verification keys.
pub trait KeyResolver: Send + Sync {
    /// Look up the key for the client named by the assertion.
    fn resolve(
        &self,
        issuer: Option<&str>,
        subject: Option<&str>,
    ) -> Result<Arc<ClientKey>, KeyResolutionError>;
}

/// Fixed in-memory set of client keys, keyed by client id.
#[derive(Debug, Default, Clone)]
pub struct StaticKeyResolver {
    keys: HashMap<String, Arc<ClientKey>>,
}

#[derive(Deserialize)]
struct ClientKeyEntry {
    alg: Algorithm,
    public_key_pem: String,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, client_id: impl Into<String>, key: ClientKey) -> Self {
        self.insert(client_id, key);
        self
    }

    pub fn insert(&mut self, client_id: impl Into<String>, key: ClientKey) {
        self.keys.insert(client_id.into(), Arc::new(key));
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Load keys from JSON of the form
    /// `{"<client_id>": {"alg": "EdDSA", "public_key_pem": "..."}}`.
    pub fn from_json_str(json: &str) -> Result<Self, KeyResolutionError> {
        let entries: HashMap<String, ClientKeyEntry> =
            serde_json::from_str(json).map_err(|e| KeyResolutionError::Load(e.to_string()))?;

        let mut resolver = Self::new();
        for (client_id, entry) in entries {
            let key = ClientKey::from_pem(entry.alg, &entry.public_key_pem).map_err(|e| {
                tracing::error!(
                    target: "client_auth.keys",
                    error = %e,
                    "Rejected client key while loading key file"
                );
                e
            })?;
            resolver.insert(client_id, key);
        }

        Ok(resolver)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, KeyResolutionError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| KeyResolutionError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve(
        &self,
        issuer: Option<&str>,
        subject: Option<&str>,
    ) -> Result<Arc<ClientKey>, KeyResolutionError> {
        let client_id = subject
            .or(issuer)
            .filter(|id| !id.is_empty())
            .ok_or(KeyResolutionError::NoClientIdentifier)?;

        self.keys
            .get(client_id)
            .cloned()
            .ok_or(KeyResolutionError::UnknownClient)
    }
}
