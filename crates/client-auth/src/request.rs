//! Request-side abstractions: body parameters and endpoint path handling.

use std::collections::HashMap;

/// Body parameter carrying the assertion type URN.
pub const CLIENT_ASSERTION_TYPE: &str = "client_assertion_type";

/// Body parameter carrying the compact-serialized JWT.
pub const CLIENT_ASSERTION: &str = "client_assertion";

/// The only assertion type this authenticator handles (RFC 7523).
pub const JWT_BEARER_ASSERTION_TYPE: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Path of the backchannel (CIBA) authentication endpoint.
pub const BACKCHANNEL_ENDPOINT_PATH: &str = "/oauth2/ciba";

/// Path of the token endpoint.
pub const TOKEN_ENDPOINT_PATH: &str = "/oauth2/token";

/// Read access to the parameters of a request body.
pub trait BodyParams {
    /// First value of `name`, if present.
    fn get_param(&self, name: &str) -> Option<&str>;
}

impl BodyParams for HashMap<String, String> {
    fn get_param(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Form bodies with repeated keys; the first value wins.
impl BodyParams for HashMap<String, Vec<String>> {
    fn get_param(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Normalize a request path for endpoint comparison.
///
/// Strips the query string, collapses repeated `/` and drops a trailing `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split_once('?').map_or(path, |(p, _)| p);

    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Whether the request targets the backchannel authentication endpoint.
pub fn is_backchannel_path(request_path: &str) -> bool {
    normalize_path(request_path) == BACKCHANNEL_ENDPOINT_PATH
}
