//! private_key_jwt client authentication.
//!
//! Authenticates OAuth2 / OpenID Connect clients that prove their identity
//! with a JWT signed by their own private key (RFC 7523 client assertions).
//!
//! # Modules
//!
//! - `assertion` - Assertion extraction and claim access
//! - `authenticator` - The authenticator façade used by the OAuth2 server
//! - `config` - Validation policy and service configuration
//! - `context` - Per-request authentication state
//! - `errors` - Error types
//! - `keys` - Client key resolution
//! - `replay` - Replay cache for assertion identifiers
//! - `validator` - Ordered claims validation
//! - `handlers`, `routes` - HTTP adapter for the standalone service
//! - `tasks` - Background tasks

pub mod assertion;
pub mod authenticator;
pub mod config;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod keys;
pub mod observability;
pub mod replay;
pub mod request;
pub mod routes;
pub mod tasks;
pub mod validator;
