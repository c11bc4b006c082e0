//! Audience selection for token endpoint and backchannel requests.

use client_auth::config::{
    ValidationPolicy, DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS, DEFAULT_TOKEN_ENDPOINT_ALIAS,
};
use client_auth::context::RequestAuthnContext;
use client_auth_test_utils::{
    assertion_params, test_authenticator, test_now, FixedClock, TestAssertionBuilder,
    TestAuthenticator,
};
use std::collections::HashMap;

fn setup(policy: ValidationPolicy) -> TestAuthenticator {
    test_authenticator(policy, &[("client123", 1)], FixedClock::at(test_now()))
}

fn authenticate(setup: &TestAuthenticator, path: &str, aud: &str) -> Result<bool, anyhow::Error> {
    let assertion = TestAssertionBuilder::for_client("client123", test_now())
        .audience(aud)
        .sign_ed25519(1);
    let mut ctx = RequestAuthnContext::new();
    Ok(setup
        .authenticator
        .authenticate_client(path, &assertion_params(&assertion), &mut ctx)?)
}

/// The backchannel endpoint accepts only the backchannel audience, even
/// when the token endpoint alias would otherwise be valid.
#[test]
fn test_backchannel_requires_backchannel_audience() -> Result<(), anyhow::Error> {
    let setup = setup(ValidationPolicy::default());

    assert!(!authenticate(&setup, "/oauth2/ciba", DEFAULT_TOKEN_ENDPOINT_ALIAS)?);
    assert!(authenticate(&setup, "/oauth2/ciba", DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS)?);

    Ok(())
}

/// The token endpoint does not accept the backchannel audience.
#[test]
fn test_token_endpoint_rejects_backchannel_audience() -> Result<(), anyhow::Error> {
    let setup = setup(ValidationPolicy::default());

    assert!(!authenticate(&setup, "/oauth2/token", DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS)?);
    assert!(authenticate(&setup, "/oauth2/token", DEFAULT_TOKEN_ENDPOINT_ALIAS)?);

    Ok(())
}

/// Trailing slashes, repeated slashes and query strings still select the
/// backchannel audience rule.
#[test]
fn test_backchannel_path_normalization() -> Result<(), anyhow::Error> {
    let setup = setup(ValidationPolicy::default());

    for path in ["/oauth2/ciba/", "//oauth2//ciba", "/oauth2/ciba?auth_req=1"] {
        assert!(
            authenticate(&setup, path, DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS)?,
            "{path} should be treated as the backchannel endpoint"
        );
    }

    Ok(())
}

/// Configured audiences replace the token endpoint alias for non-backchannel
/// calls but do not affect the backchannel rule.
#[test]
fn test_configured_audiences() -> Result<(), anyhow::Error> {
    let policy = ValidationPolicy::from_vars(&HashMap::from([
        (
            "ValidAudiences".to_string(),
            "https://idp.example/token,https://idp.example/par".to_string(),
        ),
        (
            "BackchannelEndpointAlias".to_string(),
            "https://idp.example/ciba".to_string(),
        ),
    ]));
    let setup = setup(policy);

    assert!(authenticate(&setup, "/oauth2/token", "https://idp.example/par")?);
    assert!(!authenticate(&setup, "/oauth2/token", DEFAULT_TOKEN_ENDPOINT_ALIAS)?);
    assert!(!authenticate(&setup, "/oauth2/ciba", "https://idp.example/token")?);
    assert!(authenticate(&setup, "/oauth2/ciba", "https://idp.example/ciba")?);

    Ok(())
}
