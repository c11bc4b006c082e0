//! Observability for client authentication.
//!
//! Logging follows a privacy-by-default scheme:
//! - **SAFE**: may be logged in plaintext (rejection reasons, algorithms, endpoint kind)
//! - **HASHED**: logged only as a correlation hash (client id)
//! - **NEVER**: must not appear in logs (the assertion, claim values, key material)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Correlation hash for values that must not be logged in plaintext.
///
/// First 8 hex chars of SHA-256: enough to correlate log lines for one
/// client, short enough to limit reversibility.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}
