//! JWT utilities shared by the client authentication crates.
//!
//! This module provides:
//! - Size limits for DoS prevention
//! - Clock skew constants for `iat` validation
//! - Splitting and decoding of compact JWS serializations
//! - Ed25519 public key decoding
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Unsecured JWTs (`alg: none`) are not accepted as JWS and fail parsing
//! - Generic error messages prevent information leakage
//! - Nothing in this module verifies a signature; callers MUST verify
//!   [`CompactJws::signature`] over [`CompactJws::signing_input`] before
//!   trusting [`CompactJws::payload`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_compact_jws, MAX_JWT_SIZE_BYTES};
//!
//! let jws = split_compact_jws(assertion)?;
//! let key = resolve_key(&jws.payload)?;
//! let message = jws.signing_input.as_bytes();
//! jsonwebtoken::crypto::verify(jws.signature, message, &key, jws.header.alg)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Header;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Assertions larger than this are rejected BEFORE any base64 decoding or
/// JSON parsing. A client assertion with the standard claim set and an RSA
/// signature is well under 1KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Tokens with `iat` (issued-at) timestamps more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Configured values above this are clamped.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing a compact JWS.
///
/// Note: Display strings are intentionally generic. Detailed information is
/// logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionParseError {
    /// Token size exceeds maximum allowed.
    #[error("Error while parsing the JWT.")]
    TokenTooLarge,

    /// Token is not three non-empty base64url segments.
    #[error("Error while parsing the JWT.")]
    MalformedToken,

    /// Header is valid JSON but not a JWS header with a supported `alg`.
    #[error("Error while parsing the JWT.")]
    UnsupportedHeader,

    /// Payload is not a JSON object.
    #[error("Error while parsing the JWT.")]
    InvalidPayload,
}

// =============================================================================
// Compact JWS
// =============================================================================

/// A compact JWS split into its parts, with header and payload decoded.
///
/// Borrowed segments point into the original token string.
#[derive(Debug, Clone)]
pub struct CompactJws<'a> {
    /// Decoded JOSE header.
    pub header: Header,
    /// Decoded claims object. NOT verified.
    pub payload: Map<String, Value>,
    /// `base64url(header) || '.' || base64url(payload)`, the bytes the signature covers.
    pub signing_input: &'a str,
    /// The base64url-encoded signature segment.
    pub signature: &'a str,
}

/// Split and decode a compact JWS serialization without verifying it.
///
/// # Errors
///
/// Returns `AssertionParseError` variants:
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not exactly three non-empty segments, bad base64url,
///   or a header that is not JSON
/// - `UnsupportedHeader` - Header JSON is not a JWS header (e.g. `alg: none`)
/// - `InvalidPayload` - Payload is not a JSON object
pub fn split_compact_jws(token: &str) -> Result<CompactJws<'_>, AssertionParseError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(AssertionParseError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let (signing_input, signature) = token
        .rsplit_once('.')
        .ok_or(AssertionParseError::MalformedToken)?;
    let (header_part, payload_part) = signing_input
        .split_once('.')
        .ok_or(AssertionParseError::MalformedToken)?;

    if header_part.is_empty()
        || payload_part.is_empty()
        || signature.is_empty()
        || payload_part.contains('.')
    {
        tracing::debug!(
            target: "common.jwt",
            segments = token.split('.').count(),
            "Token rejected: invalid JWS compact serialization"
        );
        return Err(AssertionParseError::MalformedToken);
    }

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        AssertionParseError::MalformedToken
    })?;

    let header_json: Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        AssertionParseError::MalformedToken
    })?;

    let header: Header = serde_json::from_value(header_json).map_err(|e| {
        tracing::debug!(
            target: "common.jwt",
            error = %e,
            "JWT header is not a supported JWS header"
        );
        AssertionParseError::UnsupportedHeader
    })?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
        AssertionParseError::MalformedToken
    })?;

    let payload: Map<String, Value> = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "JWT payload is not a JSON object");
        AssertionParseError::InvalidPayload
    })?;

    URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT signature base64");
        AssertionParseError::MalformedToken
    })?;

    Ok(CompactJws {
        header,
        payload,
        signing_input,
        signature,
    })
}

/// Decode an Ed25519 public key from PEM format.
///
/// Strips PEM header/footer lines and decodes the base64 content. The result
/// is suitable for `DecodingKey::from_ed_der`.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64 content cannot be decoded.
pub fn decode_ed25519_public_key_pem(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let b64: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64)
}

// =============================================================================
// Tests
// =============================================================================
