//! End-to-end authentication through the authenticator façade.

use chrono::Duration;
use client_auth::config::ValidationPolicy;
use client_auth::context::{AuthnState, RequestAuthnContext, Verdict};
use client_auth::errors::ClientAuthError;
use client_auth::replay::ReplayCache;
use client_auth::request::{CLIENT_ASSERTION, CLIENT_ASSERTION_TYPE, JWT_BEARER_ASSERTION_TYPE};
use client_auth::validator::Clock;
use client_auth_test_utils::{
    assertion_params, test_authenticator, test_now, FixedClock, TestAssertionBuilder,
};
use std::collections::HashMap;

const TOKEN_PATH: &str = "/oauth2/token";

fn default_setup() -> client_auth_test_utils::TestAuthenticator {
    test_authenticator(
        ValidationPolicy::default(),
        &[("client123", 1)],
        FixedClock::at(test_now()),
    )
}

/// A fresh, correctly signed assertion authenticates and names its client.
/// Presenting it again in a new request is a replay.
#[test]
fn test_worked_example_accept_then_replay() -> Result<(), anyhow::Error> {
    let setup = default_setup();
    let assertion = TestAssertionBuilder::for_client("client123", test_now())
        .jwt_id("8f14e45f-ceea-467f-a8f7-3f0a2b1c9d10")
        .sign_ed25519(1);
    let params = assertion_params(&assertion);

    let mut first = RequestAuthnContext::new();
    assert!(setup.authenticator.can_authenticate(&params));
    assert!(setup.authenticator.authenticate_client(TOKEN_PATH, &params, &mut first)?);
    assert_eq!(setup.authenticator.client_id(&params, &mut first)?, "client123");
    assert!(setup
        .replay_cache
        .is_known("8f14e45f-ceea-467f-a8f7-3f0a2b1c9d10", test_now()));

    let mut second = RequestAuthnContext::new();
    assert!(!setup.authenticator.authenticate_client(TOKEN_PATH, &params, &mut second)?);
    assert_eq!(second.state(), AuthnState::Validated(Verdict::Rejected));

    Ok(())
}

/// Once the context holds the assertion, later calls in the same request do
/// not need the body parameters.
#[test]
fn test_extraction_is_idempotent_within_request() -> Result<(), anyhow::Error> {
    let setup = default_setup();
    let assertion = TestAssertionBuilder::for_client("client123", test_now()).sign_ed25519(1);
    let mut params = assertion_params(&assertion);
    let mut ctx = RequestAuthnContext::new();

    assert!(setup.authenticator.authenticate_client(TOKEN_PATH, &params, &mut ctx)?);

    params.remove(CLIENT_ASSERTION);
    params.remove(CLIENT_ASSERTION_TYPE);

    assert_eq!(setup.authenticator.client_id(&params, &mut ctx)?, "client123");
    assert!(setup.authenticator.authenticate_client(TOKEN_PATH, &params, &mut ctx)?);

    Ok(())
}

/// A tampered signature is rejected and the jti is not recorded.
#[test]
fn test_tampered_assertion_rejected_without_recording() -> Result<(), anyhow::Error> {
    let setup = default_setup();
    let assertion = TestAssertionBuilder::for_client("client123", test_now())
        .jwt_id("tampered-jti")
        .sign_ed25519(2);
    let params = assertion_params(&assertion);
    let mut ctx = RequestAuthnContext::new();

    assert!(!setup.authenticator.authenticate_client(TOKEN_PATH, &params, &mut ctx)?);
    assert!(!setup.replay_cache.is_known("tampered-jti", test_now()));
    assert!(setup.replay_cache.is_empty());

    Ok(())
}

/// Without the jti cache the same assertion authenticates every time.
#[test]
fn test_cache_disabled_allows_reuse() -> Result<(), anyhow::Error> {
    let policy = ValidationPolicy::from_vars(&HashMap::from([(
        "EnableCacheForJTI".to_string(),
        "false".to_string(),
    )]));
    let setup = test_authenticator(policy, &[("client123", 1)], FixedClock::at(test_now()));
    let assertion = TestAssertionBuilder::for_client("client123", test_now()).sign_ed25519(1);
    let params = assertion_params(&assertion);

    for _ in 0..3 {
        let mut ctx = RequestAuthnContext::new();
        assert!(setup.authenticator.authenticate_client(TOKEN_PATH, &params, &mut ctx)?);
    }
    assert!(setup.replay_cache.is_empty());

    Ok(())
}

/// The exp boundary is strict: valid one second before, rejected at exp.
#[test]
fn test_expiry_follows_clock() -> Result<(), anyhow::Error> {
    let setup = default_setup();
    let exp = test_now() + Duration::minutes(2);

    setup.clock.set(exp - Duration::seconds(1));
    let assertion = TestAssertionBuilder::for_client("client123", test_now())
        .expires_at(exp)
        .sign_ed25519(1);
    let mut ctx = RequestAuthnContext::new();
    assert!(setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &assertion_params(&assertion), &mut ctx)?);

    setup.clock.set(exp);
    let assertion = TestAssertionBuilder::for_client("client123", test_now())
        .expires_at(exp)
        .sign_ed25519(1);
    let mut ctx = RequestAuthnContext::new();
    assert!(!setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &assertion_params(&assertion), &mut ctx)?);

    Ok(())
}

/// A replayed jti is accepted again once its first assertion expired.
#[test]
fn test_jti_reusable_after_expiry() -> Result<(), anyhow::Error> {
    let setup = default_setup();
    let first = TestAssertionBuilder::for_client("client123", test_now())
        .jwt_id("reused")
        .sign_ed25519(1);
    let mut ctx = RequestAuthnContext::new();
    assert!(setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &assertion_params(&first), &mut ctx)?);

    setup.clock.advance(Duration::minutes(10));
    let later = setup.clock.now();
    let second = TestAssertionBuilder::for_client("client123", later)
        .jwt_id("reused")
        .sign_ed25519(1);
    let mut ctx = RequestAuthnContext::new();
    assert!(setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &assertion_params(&second), &mut ctx)?);

    Ok(())
}

/// A freshly signed assertion reusing a live jti is a replay even though the
/// token itself differs.
#[test]
fn test_distinct_assertion_with_live_jti_rejected() -> Result<(), anyhow::Error> {
    let setup = default_setup();
    let first = TestAssertionBuilder::for_client("client123", test_now())
        .jwt_id("shared-jti")
        .sign_ed25519(1);
    let second = TestAssertionBuilder::for_client("client123", test_now())
        .jwt_id("shared-jti")
        .issued_at(test_now() - Duration::seconds(5))
        .sign_ed25519(1);
    assert_ne!(first, second);

    let mut ctx = RequestAuthnContext::new();
    assert!(setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &assertion_params(&first), &mut ctx)?);

    let mut ctx = RequestAuthnContext::new();
    assert!(!setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &assertion_params(&second), &mut ctx)?);
    assert_eq!(ctx.state(), AuthnState::Validated(Verdict::Rejected));

    Ok(())
}

/// Configured reject-before window bounds the assertion's age.
#[test]
fn test_reject_before_from_properties() -> Result<(), anyhow::Error> {
    let policy = ValidationPolicy::from_vars(&HashMap::from([(
        "RejectBeforeInMinutes".to_string(),
        "2".to_string(),
    )]));
    let setup = test_authenticator(policy, &[("client123", 1)], FixedClock::at(test_now()));

    let stale = TestAssertionBuilder::for_client("client123", test_now() - Duration::minutes(3))
        .expires_at(test_now() + Duration::minutes(5))
        .sign_ed25519(1);
    let mut ctx = RequestAuthnContext::new();
    assert!(!setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &assertion_params(&stale), &mut ctx)?);

    Ok(())
}

/// Missing or malformed assertions are request errors, not rejections.
#[test]
fn test_invalid_requests() {
    let setup = default_setup();

    let mut ctx = RequestAuthnContext::new();
    let result = setup
        .authenticator
        .authenticate_client(TOKEN_PATH, &HashMap::<String, String>::new(), &mut ctx);
    assert!(matches!(result, Err(ClientAuthError::InvalidRequest(_))));

    // {"alg":"none"}.{"sub":"client123"}.sig
    let alg_none = "eyJhbGciOiJub25lIn0.eyJzdWIiOiJjbGllbnQxMjMifQ.c2ln";
    let mut ctx = RequestAuthnContext::new();
    let result = setup.authenticator.authenticate_client(
        TOKEN_PATH,
        &assertion_params(alg_none),
        &mut ctx,
    );
    assert!(matches!(result, Err(ClientAuthError::InvalidRequest(_))));

    let oversize = format!("{}.{}.{}", "a".repeat(4096), "b".repeat(4096), "c".repeat(16));
    let mut ctx = RequestAuthnContext::new();
    let result = setup.authenticator.authenticate_client(
        TOKEN_PATH,
        &assertion_params(&oversize),
        &mut ctx,
    );
    assert_eq!(
        result,
        Err(ClientAuthError::InvalidRequest(
            "Error while parsing the JWT.".to_string()
        ))
    );
}

/// Form bodies with repeated keys use the first value.
#[test]
fn test_multi_value_params() -> Result<(), anyhow::Error> {
    let setup = default_setup();
    let assertion = TestAssertionBuilder::for_client("client123", test_now()).sign_ed25519(1);

    let params: HashMap<String, Vec<String>> = HashMap::from([
        (
            CLIENT_ASSERTION_TYPE.to_string(),
            vec![JWT_BEARER_ASSERTION_TYPE.to_string()],
        ),
        (
            CLIENT_ASSERTION.to_string(),
            vec![assertion, "ignored".to_string()],
        ),
    ]);

    let mut ctx = RequestAuthnContext::new();
    assert!(setup.authenticator.can_authenticate(&params));
    assert!(setup.authenticator.authenticate_client(TOKEN_PATH, &params, &mut ctx)?);

    Ok(())
}
