//! Assembled authenticators and request parameters for tests.

use crate::clock::FixedClock;
use crate::crypto_fixtures::test_key_resolver;
use client_auth::authenticator::PrivateKeyJwtAuthenticator;
use client_auth::config::ValidationPolicy;
use client_auth::replay::InMemoryReplayCache;
use client_auth::request::{CLIENT_ASSERTION, CLIENT_ASSERTION_TYPE, JWT_BEARER_ASSERTION_TYPE};
use client_auth::validator::ClaimsValidator;
use std::collections::HashMap;
use std::sync::Arc;

/// An authenticator and the collaborators a test may want to inspect.
pub struct TestAuthenticator {
    pub authenticator: PrivateKeyJwtAuthenticator,
    pub replay_cache: Arc<InMemoryReplayCache>,
    pub clock: FixedClock,
}

/// Build an authenticator for `clients` (`(client_id, key seed)` pairs) with
/// an in-memory replay cache and the given clock.
pub fn test_authenticator(
    policy: ValidationPolicy,
    clients: &[(&str, u8)],
    clock: FixedClock,
) -> TestAuthenticator {
    let replay_cache = Arc::new(InMemoryReplayCache::new());
    let validator = ClaimsValidator::new(
        policy,
        Arc::new(test_key_resolver(clients)),
        replay_cache.clone(),
    )
    .with_clock(Arc::new(clock.clone()));

    TestAuthenticator {
        authenticator: PrivateKeyJwtAuthenticator::from_validator(validator),
        replay_cache,
        clock,
    }
}

/// Body parameters of a request carrying `assertion` as a JWT bearer
/// client assertion.
pub fn assertion_params(assertion: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert(
        CLIENT_ASSERTION_TYPE.to_string(),
        JWT_BEARER_ASSERTION_TYPE.to_string(),
    );
    params.insert(CLIENT_ASSERTION.to_string(), assertion.to_string());
    params
}

/// URL-encoded form body for `assertion`.
pub fn assertion_form_body(assertion: &str) -> String {
    format!(
        "{}={}&{}={}",
        CLIENT_ASSERTION_TYPE,
        JWT_BEARER_ASSERTION_TYPE.replace(':', "%3A"),
        CLIENT_ASSERTION,
        assertion
    )
}
