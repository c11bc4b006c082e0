use crate::handlers::client_auth_handler::{handle_client_authentication, AppState};
use crate::handlers::metrics::metrics_handler;
use crate::request::{BACKCHANNEL_ENDPOINT_PATH, TOKEN_ENDPOINT_PATH};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_routes(state: Arc<AppState>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        // Client authentication for the token and backchannel endpoints
        .route(TOKEN_ENDPOINT_PATH, post(handle_client_authentication))
        .route(BACKCHANNEL_ENDPOINT_PATH, post(handle_client_authentication))
        // Health check
        .route("/health", get(health_check))
        .with_state(state);

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(handle),
        );
    }

    // Add tracing middleware
    router.layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}
