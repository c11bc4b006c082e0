//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Client assertions
//! are bearer credentials for as long as they are unexpired and unconsumed, so
//! they are held as [`SecretString`] wherever they are stored.
//!
//! # Compile-Time Safety
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! struct that derives `Debug` and contains a secret gets safe logging
//! behavior for free.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct TokenRequest {
//!     client_assertion_type: String,
//!     client_assertion: SecretString,  // Debug shows "[REDACTED]"
//! }
//!
//! let req = TokenRequest {
//!     client_assertion_type: "urn:ietf:params:oauth:client-assertion-type:jwt-bearer".to_string(),
//!     client_assertion: SecretString::from("eyJhbGciOiJFZERTQSJ9.e30.c2ln"),
//! };
//!
//! println!("{:?}", req);
//!
//! let assertion: &str = req.client_assertion.expose_secret();
//! assert!(assertion.starts_with("eyJ"));
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
