use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the private_key_jwt authenticator.
///
/// Messages are deliberately generic. The specific rejection reason goes to
/// logs and metrics only, never to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientAuthError {
    /// The request or assertion is malformed (wrong assertion type,
    /// unparseable JWT).
    #[error("{0}")]
    InvalidRequest(String),

    /// The assertion parsed but did not pass validation.
    #[error("Client authentication failed")]
    InvalidClient,

    #[error("Internal server error")]
    Internal,
}

impl ClientAuthError {
    /// OAuth2 error code for this failure (RFC 6749 section 5.2).
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientAuthError::InvalidRequest(_) => "invalid_request",
            ClientAuthError::InvalidClient => "invalid_client",
            ClientAuthError::Internal => "server_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    error_description: String,
}

impl IntoResponse for ClientAuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            ClientAuthError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ClientAuthError::InvalidClient => StatusCode::UNAUTHORIZED,
            ClientAuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error_response = ErrorResponse {
            error: self.error_code(),
            error_description: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}
