//! Common utilities shared across the client authentication crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (compact serialization parsing, size limits, key decoding)
pub mod jwt;
