//! HTTP adapter tests, driven through the router without a socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use client_auth::config::{ValidationPolicy, DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS};
use client_auth::handlers::client_auth_handler::AppState;
use client_auth::routes::build_routes;
use client_auth_test_utils::{
    assertion_form_body, test_authenticator, test_now, FixedClock, TestAssertionBuilder,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let setup = test_authenticator(
        ValidationPolicy::default(),
        &[("client123", 1)],
        FixedClock::at(test_now()),
    );
    build_routes(
        Arc::new(AppState {
            authenticator: setup.authenticator,
        }),
        None,
    )
}

fn form_request(path: &str, body: String) -> Result<Request<Body>, anyhow::Error> {
    Ok(Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))?)
}

async fn json_body(response: axum::response::Response) -> Result<serde_json::Value, anyhow::Error> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

/// A valid assertion returns 200 with the client id; replaying it returns 401.
#[tokio::test]
async fn test_token_endpoint_accepts_then_rejects_replay() -> Result<(), anyhow::Error> {
    let app = app();
    let assertion = TestAssertionBuilder::for_client("client123", test_now()).sign_ed25519(1);

    let response = app
        .clone()
        .oneshot(form_request("/oauth2/token", assertion_form_body(&assertion))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["client_id"], "client123");

    let response = app
        .oneshot(form_request("/oauth2/token", assertion_form_body(&assertion))?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "invalid_client");
    assert_eq!(body["error_description"], "Client authentication failed");

    Ok(())
}

/// The backchannel route applies the backchannel audience.
#[tokio::test]
async fn test_backchannel_endpoint() -> Result<(), anyhow::Error> {
    let app = app();

    let token_aud = TestAssertionBuilder::for_client("client123", test_now()).sign_ed25519(1);
    let response = app
        .clone()
        .oneshot(form_request("/oauth2/ciba", assertion_form_body(&token_aud))?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let ciba_aud = TestAssertionBuilder::for_client("client123", test_now())
        .audience(DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS)
        .sign_ed25519(1);
    let response = app
        .oneshot(form_request("/oauth2/ciba", assertion_form_body(&ciba_aud))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// A malformed assertion is a 400 with `invalid_request`.
#[tokio::test]
async fn test_malformed_assertion_is_bad_request() -> Result<(), anyhow::Error> {
    let response = app()
        .oneshot(form_request("/oauth2/token", assertion_form_body("not-a-jwt"))?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["error_description"], "Error while parsing the JWT.");

    Ok(())
}

/// A request without a JWT bearer assertion type is not authenticated.
#[tokio::test]
async fn test_wrong_assertion_type_is_unauthorized() -> Result<(), anyhow::Error> {
    let body = "client_assertion_type=urn%3Aexample%3Aother&client_assertion=a.b.c".to_string();
    let response = app().oneshot(form_request("/oauth2/token", body)?).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?["error"], "invalid_client");

    Ok(())
}

/// GET /health returns 200 OK
#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await?.to_bytes();
    assert_eq!(String::from_utf8(bytes.to_vec())?, "OK");

    Ok(())
}

/// Without a metrics handle the /metrics route is not mounted.
#[tokio::test]
async fn test_metrics_route_absent_without_handle() -> Result<(), anyhow::Error> {
    let response = app()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
