//! The private_key_jwt client authenticator.
//!
//! Entry point for the OAuth2 server: decides whether a request carries a JWT
//! bearer client assertion, authenticates it, and names the client.

use crate::assertion::extract;
use crate::config::ValidationPolicy;
use crate::context::RequestAuthnContext;
use crate::errors::ClientAuthError;
use crate::keys::KeyResolver;
use crate::observability::hash_for_correlation;
use crate::replay::ReplayCache;
use crate::request::{
    is_backchannel_path, BodyParams, CLIENT_ASSERTION, CLIENT_ASSERTION_TYPE,
    JWT_BEARER_ASSERTION_TYPE,
};
use crate::validator::ClaimsValidator;
use std::sync::Arc;
use tracing::instrument;

/// Authenticates OAuth2 clients by signed JWT assertion (RFC 7523).
pub struct PrivateKeyJwtAuthenticator {
    validator: ClaimsValidator,
}

impl PrivateKeyJwtAuthenticator {
    pub fn new(
        policy: ValidationPolicy,
        keys: Arc<dyn KeyResolver>,
        replay_cache: Arc<dyn ReplayCache>,
    ) -> Self {
        Self::from_validator(ClaimsValidator::new(policy, keys, replay_cache))
    }

    pub fn from_validator(validator: ClaimsValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &ClaimsValidator {
        &self.validator
    }

    pub fn policy(&self) -> &ValidationPolicy {
        self.validator.policy()
    }

    /// Whether the request declares a JWT bearer assertion and carries one.
    pub fn can_authenticate<P>(&self, params: &P) -> bool
    where
        P: BodyParams + ?Sized,
    {
        let assertion_type = params.get_param(CLIENT_ASSERTION_TYPE);
        tracing::debug!(
            target: "client_auth.authenticator",
            client_assertion_type = assertion_type.unwrap_or_default(),
            "Checking client assertion type"
        );

        assertion_type == Some(JWT_BEARER_ASSERTION_TYPE)
            && params
                .get_param(CLIENT_ASSERTION)
                .is_some_and(|a| !a.is_empty())
    }

    /// Authenticate the request's client assertion.
    ///
    /// Returns `Ok(false)` for any validation failure. A malformed or missing
    /// assertion is an `InvalidRequest` error. The verdict is recorded on
    /// `ctx`; later calls for the same request return it without validating
    /// again, so the assertion's `jti` is never counted as its own replay.
    #[instrument(skip_all)]
    pub fn authenticate_client<P>(
        &self,
        request_path: &str,
        params: &P,
        ctx: &mut RequestAuthnContext,
    ) -> Result<bool, ClientAuthError>
    where
        P: BodyParams + ?Sized,
    {
        if let Some(verdict) = ctx.verdict() {
            return Ok(verdict.is_accepted());
        }

        let is_backchannel = is_backchannel_path(request_path);
        let assertion = extract(params, ctx)?;
        let accepted = self.validator.is_valid_assertion(assertion, is_backchannel);

        Ok(ctx.record_verdict(accepted.into()).is_accepted())
    }

    /// The client id (`sub`) of the request's assertion.
    ///
    /// Claims are read without validation; callers authenticate first.
    #[instrument(skip_all)]
    pub fn client_id<P>(
        &self,
        params: &P,
        ctx: &mut RequestAuthnContext,
    ) -> Result<String, ClientAuthError>
    where
        P: BodyParams + ?Sized,
    {
        let assertion = extract(params, ctx)?;
        let claims = self.validator.claims(assertion);

        match self.validator.resolve_subject(claims) {
            Some(client_id) => {
                tracing::debug!(
                    target: "client_auth.authenticator",
                    client = %hash_for_correlation(&client_id),
                    "Resolved client id from assertion subject"
                );
                Ok(client_id)
            }
            None => {
                tracing::debug!(
                    target: "client_auth.authenticator",
                    "Assertion has no subject"
                );
                Err(ClientAuthError::InvalidRequest(
                    "Client assertion does not contain a subject".to_string(),
                ))
            }
        }
    }
}
