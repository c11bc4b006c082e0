use crate::authenticator::PrivateKeyJwtAuthenticator;
use crate::context::RequestAuthnContext;
use crate::errors::ClientAuthError;
use crate::observability::metrics::record_request;
use crate::request::is_backchannel_path;
use axum::{extract::State, http::Uri, Form, Json};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinError;

/// Application state shared across handlers
pub struct AppState {
    pub authenticator: PrivateKeyJwtAuthenticator,
}

#[derive(Debug, Serialize)]
pub struct ClientAuthResponse {
    pub client_id: String,
}

/// Authenticate the client of a token or backchannel request
///
/// POST /oauth2/token, POST /oauth2/ciba
pub async fn handle_client_authentication(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Json<ClientAuthResponse>, ClientAuthError> {
    let path = uri.path().to_string();
    let endpoint = if is_backchannel_path(&path) {
        "backchannel"
    } else {
        "token"
    };

    // Signature verification is CPU-bound; keep it off the async workers
    let client_id = tokio::task::spawn_blocking(move || {
        authenticate(&state.authenticator, &path, &params, endpoint)
    })
    .await
    .map_err(|e| {
        record_request(endpoint, "error");
        internal_error(e)
    })??;

    Ok(Json(ClientAuthResponse { client_id }))
}

fn authenticate(
    authenticator: &PrivateKeyJwtAuthenticator,
    path: &str,
    params: &HashMap<String, String>,
    endpoint: &'static str,
) -> Result<String, ClientAuthError> {
    if !authenticator.can_authenticate(params) {
        record_request(endpoint, "ineligible");
        return Err(ClientAuthError::InvalidClient);
    }

    let mut ctx = RequestAuthnContext::new();
    let accepted = authenticator
        .authenticate_client(path, params, &mut ctx)
        .inspect_err(|_| record_request(endpoint, "invalid_request"))?;

    if !accepted {
        record_request(endpoint, "rejected");
        return Err(ClientAuthError::InvalidClient);
    }

    let client_id = authenticator.client_id(params, &mut ctx)?;
    record_request(endpoint, "accepted");

    Ok(client_id)
}

fn internal_error(e: JoinError) -> ClientAuthError {
    tracing::error!(
        target: "client_auth.handlers",
        error = %e,
        "Client authentication task failed"
    );
    ClientAuthError::Internal
}
