//! Client assertion extraction and claim access.
//!
//! The assertion is pulled from the `client_assertion` body parameter, parsed
//! once per request, and cached on the [`RequestAuthnContext`]. Later lookups
//! in the same request (validation, client id resolution) reuse the cached
//! value even if the parameter map has since been modified.

use crate::context::RequestAuthnContext;
use crate::errors::ClientAuthError;
use crate::request::{BodyParams, CLIENT_ASSERTION, JWT_BEARER_ASSERTION_TYPE};
use chrono::{DateTime, Utc};
use common::jwt::{split_compact_jws, AssertionParseError};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::Header;
use serde_json::{Map, Value};
use std::fmt;

// Registered claim names (RFC 7519 section 4.1)
pub const CLAIM_ISSUER: &str = "iss";
pub const CLAIM_SUBJECT: &str = "sub";
pub const CLAIM_AUDIENCE: &str = "aud";
pub const CLAIM_EXPIRATION_TIME: &str = "exp";
pub const CLAIM_NOT_BEFORE: &str = "nbf";
pub const CLAIM_ISSUED_AT: &str = "iat";
pub const CLAIM_JWT_ID: &str = "jti";

/// Message for a request without a usable assertion.
pub fn missing_assertion_message() -> String {
    format!("No valid assertion was found for {JWT_BEARER_ASSERTION_TYPE}")
}

// ============================================================================
// ClaimsSet
// ============================================================================

/// The JSON claims of an assertion with typed accessors.
///
/// Accessors return `None` when a claim is absent or has the wrong JSON type;
/// validation treats both the same way.
#[derive(Clone, PartialEq)]
pub struct ClaimsSet(Map<String, Value>);

impl ClaimsSet {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.string_claim(CLAIM_ISSUER)
    }

    pub fn subject(&self) -> Option<&str> {
        self.string_claim(CLAIM_SUBJECT)
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.string_claim(CLAIM_JWT_ID)
    }

    /// `aud` as a list, accepting both the single-string and array forms.
    /// Non-string array members are skipped.
    pub fn audiences(&self) -> Vec<&str> {
        match self.0.get(CLAIM_AUDIENCE) {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.numeric_date(CLAIM_EXPIRATION_TIME)
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.numeric_date(CLAIM_NOT_BEFORE)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.numeric_date(CLAIM_ISSUED_AT)
    }

    /// Whether `name` exists with a non-null value. Strings, arrays and
    /// objects must also be non-empty.
    pub fn is_present(&self, name: &str) -> bool {
        match self.0.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Bool(_) | Value::Number(_)) => true,
        }
    }

    fn string_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    // NumericDate: seconds since the epoch, integer or fractional.
    fn numeric_date(&self, name: &str) -> Option<DateTime<Utc>> {
        let value = self.0.get(name)?;

        if let Some(secs) = value.as_i64() {
            return DateTime::from_timestamp(secs, 0);
        }

        let secs = value.as_f64().filter(|f| f.is_finite())?;
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }
}

// Claim values can identify end users; only claim names go to Debug output.
impl fmt::Debug for ClaimsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsSet")
            .field("claims", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// SignedAssertion
// ============================================================================

/// A parsed, not yet validated, client assertion.
#[derive(Debug)]
pub struct SignedAssertion {
    raw: SecretString,
    header: Header,
    claims: ClaimsSet,
}

impl SignedAssertion {
    /// Parse a compact-serialized JWS.
    ///
    /// Only the structure is checked here. The signature and claims are
    /// checked by the validator.
    pub fn parse(token: &str) -> Result<Self, AssertionParseError> {
        let jws = split_compact_jws(token)?;

        Ok(Self {
            raw: SecretString::from(token),
            header: jws.header,
            claims: ClaimsSet::new(jws.payload),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn claims(&self) -> &ClaimsSet {
        &self.claims
    }

    /// The signing input (`header.payload`) and the base64url signature.
    pub fn signing_parts(&self) -> Option<(&str, &str)> {
        self.raw.expose_secret().rsplit_once('.')
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Return the request's assertion, parsing it on first use.
///
/// Once the context holds a parsed assertion it is returned as is; the
/// parameters are not read again.
pub fn extract<'a, P>(
    params: &P,
    ctx: &'a mut RequestAuthnContext,
) -> Result<&'a SignedAssertion, ClientAuthError>
where
    P: BodyParams + ?Sized,
{
    ctx.get_or_try_insert_assertion(|| {
        let token = params
            .get_param(CLIENT_ASSERTION)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::debug!(
                    target: "client_auth.assertion",
                    "Request has no client_assertion parameter"
                );
                ClientAuthError::InvalidRequest(missing_assertion_message())
            })?;

        SignedAssertion::parse(token).map_err(|e| {
            tracing::debug!(
                target: "client_auth.assertion",
                error = ?e,
                "Client assertion could not be parsed"
            );
            ClientAuthError::InvalidRequest(e.to_string())
        })
    })
}
