//! Deterministic Ed25519 fixtures for client keys.
//!
//! The same seed always yields the same keypair, so a test can sign an
//! assertion with seed `n` and register seed `n`'s public key for the client.

use base64::engine::general_purpose;
use base64::Engine;
use client_auth::keys::{ClientKey, StaticKeyResolver};
use jsonwebtoken::Algorithm;
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Expand a one-byte seed into a 32-byte Ed25519 seed.
fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8 ^ seed);
    }
    bytes
}

/// Generate a deterministic Ed25519 signing key.
///
/// Returns `(public_key_pem, private_key_pkcs8)`. The PEM wraps the raw
/// 32-byte public key in base64, the form `ClientKey::from_pem` reads for
/// EdDSA.
pub fn test_signing_key(seed: u8) -> Result<(String, Vec<u8>), FixtureError> {
    let seed = seed_bytes(seed);

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {e:?}")))?;

    let public_key_pem = format!(
        "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
        general_purpose::STANDARD.encode(key_pair.public_key().as_ref())
    );

    Ok((public_key_pem, pkcs8_from_seed(&seed)))
}

/// Public key PEM for `seed`.
pub fn test_public_key_pem(seed: u8) -> String {
    test_signing_key(seed)
        .expect("fixture key generation should not fail")
        .0
}

/// PKCS#8 private key for `seed`, as accepted by `EncodingKey::from_ed_der`.
pub fn test_private_key_pkcs8(seed: u8) -> Vec<u8> {
    test_signing_key(seed)
        .expect("fixture key generation should not fail")
        .1
}

/// EdDSA verification key for `seed`.
pub fn test_client_key(seed: u8) -> ClientKey {
    ClientKey::from_pem(Algorithm::EdDSA, &test_public_key_pem(seed))
        .expect("fixture public key should load")
}

/// Key resolver registering each `(client_id, seed)` pair.
pub fn test_key_resolver(clients: &[(&str, u8)]) -> StaticKeyResolver {
    clients
        .iter()
        .fold(StaticKeyResolver::new(), |resolver, (client_id, seed)| {
            resolver.with_key(*client_id, test_client_key(*seed))
        })
}

/// JSON key file contents for `clients`, in the service's key file format.
pub fn test_key_file_json(clients: &[(&str, u8)]) -> String {
    let entries: serde_json::Map<String, serde_json::Value> = clients
        .iter()
        .map(|(client_id, seed)| {
            (
                (*client_id).to_string(),
                serde_json::json!({
                    "alg": "EdDSA",
                    "public_key_pem": test_public_key_pem(*seed),
                }),
            )
        })
        .collect();
    serde_json::Value::Object(entries).to_string()
}

/// PKCS#8 v1 document (RFC 5208) wrapping an Ed25519 seed.
///
/// Test-only: production keys come from a CSPRNG.
fn pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);
    // SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // version INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey OCTET STRING { OCTET STRING seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    pkcs8
}
