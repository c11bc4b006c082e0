//! Claims validation for private_key_jwt client assertions.
//!
//! Checks run in a fixed order and the first failure decides:
//!
//! 1. Signature, with the key resolved from the assertion's client id
//! 2. Mandatory claims present
//! 3. Issuer (when configured)
//! 4. Audience (endpoint-dependent)
//! 5. Expiry
//! 6. Not-before, issued-at skew, and issuance recency
//! 7. Replay (when token reuse prevention and the jti cache are enabled)
//!
//! The replay check is last so a `jti` is only recorded for assertions that
//! passed everything else. The rejection reason is logged and counted but is
//! never returned to the caller.

use crate::assertion::{ClaimsSet, SignedAssertion};
use crate::config::ValidationPolicy;
use crate::keys::{KeyResolutionError, KeyResolver};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_assertion_validation;
use crate::replay::ReplayCache;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// Why an assertion was rejected. Internal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    UnknownClient,
    KeyUnavailable,
    AlgorithmNotAllowed,
    InvalidSignature,
    MissingMandatoryClaim,
    IssuerMismatch,
    AudienceMismatch,
    InvalidExpiry,
    Expired,
    NotYetValid,
    IssuedInFuture,
    TooOld,
    MissingJwtId,
    Replayed,
    ReplayCacheUnavailable,
}

impl RejectionReason {
    /// Metric label value.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::UnknownClient => "unknown_client",
            RejectionReason::KeyUnavailable => "key_unavailable",
            RejectionReason::AlgorithmNotAllowed => "algorithm_not_allowed",
            RejectionReason::InvalidSignature => "invalid_signature",
            RejectionReason::MissingMandatoryClaim => "missing_mandatory_claim",
            RejectionReason::IssuerMismatch => "issuer_mismatch",
            RejectionReason::AudienceMismatch => "audience_mismatch",
            RejectionReason::InvalidExpiry => "invalid_expiry",
            RejectionReason::Expired => "expired",
            RejectionReason::NotYetValid => "not_yet_valid",
            RejectionReason::IssuedInFuture => "issued_in_future",
            RejectionReason::TooOld => "too_old",
            RejectionReason::MissingJwtId => "missing_jti",
            RejectionReason::Replayed => "replayed",
            RejectionReason::ReplayCacheUnavailable => "replay_cache_unavailable",
        }
    }
}

/// Validates signed client assertions against a [`ValidationPolicy`].
pub struct ClaimsValidator {
    policy: ValidationPolicy,
    keys: Arc<dyn KeyResolver>,
    replay_cache: Arc<dyn ReplayCache>,
    clock: Arc<dyn Clock>,
}

impl ClaimsValidator {
    pub fn new(
        policy: ValidationPolicy,
        keys: Arc<dyn KeyResolver>,
        replay_cache: Arc<dyn ReplayCache>,
    ) -> Self {
        Self {
            policy,
            keys,
            replay_cache,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (tests use a fixed one).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn replay_cache(&self) -> &Arc<dyn ReplayCache> {
        &self.replay_cache
    }

    /// Run every check; `true` only if all of them pass.
    #[instrument(skip_all, fields(backchannel = is_backchannel))]
    pub fn is_valid_assertion(&self, assertion: &SignedAssertion, is_backchannel: bool) -> bool {
        let start = Instant::now();
        let result = self.validate(assertion, is_backchannel);
        let duration = start.elapsed();

        let client = assertion
            .claims()
            .subject()
            .map(hash_for_correlation)
            .unwrap_or_default();

        match result {
            Ok(()) => {
                tracing::debug!(
                    target: "client_auth.validator",
                    client = %client,
                    "Client assertion accepted"
                );
                record_assertion_validation("accepted", "none", duration);
                true
            }
            Err(reason) => {
                tracing::debug!(
                    target: "client_auth.validator",
                    client = %client,
                    reason = reason.as_str(),
                    "Client assertion rejected"
                );
                record_assertion_validation("rejected", reason.as_str(), duration);
                false
            }
        }
    }

    /// The ordered check sequence. Returns the first failure.
    pub fn validate(
        &self,
        assertion: &SignedAssertion,
        is_backchannel: bool,
    ) -> Result<(), RejectionReason> {
        let now = self.clock.now();
        let claims = assertion.claims();

        self.verify_signature(assertion)?;
        self.check_mandatory_claims(claims)?;
        self.check_issuer(claims)?;
        self.check_audience(claims, is_backchannel)?;
        let expires_at = check_expiry(claims, now)?;
        self.check_issuance_window(claims, now)?;
        self.check_replay(claims, expires_at, now)
    }

    /// Claims of the assertion, without any validation.
    pub fn claims<'a>(&self, assertion: &'a SignedAssertion) -> &'a ClaimsSet {
        assertion.claims()
    }

    /// The client id asserted by `sub`, if present and non-empty.
    pub fn resolve_subject(&self, claims: &ClaimsSet) -> Option<String> {
        claims
            .subject()
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }

    fn verify_signature(&self, assertion: &SignedAssertion) -> Result<(), RejectionReason> {
        let claims = assertion.claims();
        let key = self
            .keys
            .resolve(claims.issuer(), claims.subject())
            .map_err(|e| match e {
                KeyResolutionError::UnknownClient | KeyResolutionError::NoClientIdentifier => {
                    RejectionReason::UnknownClient
                }
                other => {
                    tracing::warn!(
                        target: "client_auth.validator",
                        error = %other,
                        "Client key could not be resolved"
                    );
                    RejectionReason::KeyUnavailable
                }
            })?;

        let alg = assertion.header().alg;
        if !key.allows(alg) {
            tracing::debug!(
                target: "client_auth.validator",
                alg = ?alg,
                allowed = ?key.algorithms(),
                "Assertion algorithm not allowed for client key"
            );
            return Err(RejectionReason::AlgorithmNotAllowed);
        }

        let (signing_input, signature) = assertion
            .signing_parts()
            .ok_or(RejectionReason::InvalidSignature)?;

        match jsonwebtoken::crypto::verify(
            signature,
            signing_input.as_bytes(),
            key.decoding_key(),
            alg,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(RejectionReason::InvalidSignature),
            Err(e) => {
                tracing::debug!(
                    target: "client_auth.validator",
                    error = %e,
                    "Signature verification failed"
                );
                Err(RejectionReason::InvalidSignature)
            }
        }
    }

    fn check_mandatory_claims(&self, claims: &ClaimsSet) -> Result<(), RejectionReason> {
        match self
            .policy
            .mandatory_claims
            .iter()
            .find(|name| !claims.is_present(name))
        {
            Some(missing) => {
                tracing::debug!(
                    target: "client_auth.validator",
                    claim = %missing,
                    "Mandatory claim missing from assertion"
                );
                Err(RejectionReason::MissingMandatoryClaim)
            }
            None => Ok(()),
        }
    }

    fn check_issuer(&self, claims: &ClaimsSet) -> Result<(), RejectionReason> {
        match &self.policy.valid_issuer {
            Some(expected) if claims.issuer() != Some(expected.as_str()) => {
                Err(RejectionReason::IssuerMismatch)
            }
            _ => Ok(()),
        }
    }

    fn check_audience(
        &self,
        claims: &ClaimsSet,
        is_backchannel: bool,
    ) -> Result<(), RejectionReason> {
        if claims
            .audiences()
            .into_iter()
            .any(|aud| self.policy.accepts_audience(aud, is_backchannel))
        {
            Ok(())
        } else {
            Err(RejectionReason::AudienceMismatch)
        }
    }

    fn check_issuance_window(
        &self,
        claims: &ClaimsSet,
        now: DateTime<Utc>,
    ) -> Result<(), RejectionReason> {
        let not_before = claims.not_before();
        let issued_at = claims.issued_at();

        if let Some(nbf) = not_before {
            if now < nbf {
                return Err(RejectionReason::NotYetValid);
            }
        }

        if let Some(iat) = issued_at {
            if iat > now + Duration::seconds(self.policy.clock_skew_seconds) {
                return Err(RejectionReason::IssuedInFuture);
            }
        }

        // Recency is measured from iat, or nbf when iat is absent.
        if let Some(issued) = issued_at.or(not_before) {
            let max_age = Duration::minutes(i64::from(self.policy.reject_before_minutes));
            if now - issued > max_age {
                return Err(RejectionReason::TooOld);
            }
        }

        Ok(())
    }

    fn check_replay(
        &self,
        claims: &ClaimsSet,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), RejectionReason> {
        if !self.policy.replay_protection_enabled() {
            return Ok(());
        }

        let jti = claims
            .jwt_id()
            .filter(|j| !j.is_empty())
            .ok_or(RejectionReason::MissingJwtId)?;

        match self.replay_cache.remember_if_unseen(jti, expires_at, now) {
            Ok(true) => Ok(()),
            Ok(false) => Err(RejectionReason::Replayed),
            Err(e) => {
                tracing::warn!(
                    target: "client_auth.validator",
                    error = %e,
                    "Replay cache unavailable, rejecting assertion"
                );
                Err(RejectionReason::ReplayCacheUnavailable)
            }
        }
    }
}

fn check_expiry(claims: &ClaimsSet, now: DateTime<Utc>) -> Result<DateTime<Utc>, RejectionReason> {
    let exp = claims
        .expiration_time()
        .ok_or(RejectionReason::InvalidExpiry)?;

    if now < exp {
        Ok(exp)
    } else {
        Err(RejectionReason::Expired)
    }
}
