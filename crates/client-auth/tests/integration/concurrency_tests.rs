//! Concurrent presentation of one assertion.

use client_auth::config::ValidationPolicy;
use client_auth::context::RequestAuthnContext;
use client_auth_test_utils::{
    assertion_params, test_authenticator, test_now, FixedClock, TestAssertionBuilder,
};
use std::sync::Arc;

const THREADS: usize = 32;

/// Of N concurrent requests carrying the same assertion, exactly one is
/// authenticated.
#[test]
fn test_concurrent_replay_accepts_exactly_once() -> Result<(), anyhow::Error> {
    let setup = test_authenticator(
        ValidationPolicy::default(),
        &[("client123", 1)],
        FixedClock::at(test_now()),
    );
    let authenticator = Arc::new(setup.authenticator);
    let params = Arc::new(assertion_params(
        &TestAssertionBuilder::for_client("client123", test_now()).sign_ed25519(1),
    ));
    let barrier = Arc::new(std::sync::Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let authenticator = Arc::clone(&authenticator);
            let params = Arc::clone(&params);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                let mut ctx = RequestAuthnContext::new();
                authenticator.authenticate_client("/oauth2/token", params.as_ref(), &mut ctx)
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        let result = handle
            .join()
            .map_err(|_| anyhow::anyhow!("authentication thread panicked"))?;
        if result? {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(setup.replay_cache.len(), 1);

    Ok(())
}

/// Distinct assertions from the same client do not interfere.
#[tokio::test]
async fn test_concurrent_distinct_assertions_all_accepted() -> Result<(), anyhow::Error> {
    let setup = test_authenticator(
        ValidationPolicy::default(),
        &[("client123", 1), ("client456", 2)],
        FixedClock::at(test_now()),
    );
    let authenticator = Arc::new(setup.authenticator);

    let tasks: Vec<_> = (0..THREADS)
        .map(|i| {
            let authenticator = Arc::clone(&authenticator);
            let (client, seed) = if i % 2 == 0 { ("client123", 1) } else { ("client456", 2) };
            tokio::task::spawn_blocking(move || {
                let params = assertion_params(
                    &TestAssertionBuilder::for_client(client, test_now()).sign_ed25519(seed),
                );
                let mut ctx = RequestAuthnContext::new();
                authenticator.authenticate_client("/oauth2/token", &params, &mut ctx)
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await??);
    }
    assert_eq!(setup.replay_cache.len(), THREADS);

    Ok(())
}
