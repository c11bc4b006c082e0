//! # Client Auth Test Utilities
//!
//! Shared test utilities for the private_key_jwt authenticator.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys per seed)
//! - A client assertion builder that signs with those keys
//! - A controllable clock
//! - Helpers that assemble an authenticator for a set of test clients
//!
//! ## Usage
//!
//! ```rust,ignore
//! use client_auth_test_utils::*;
//!
//! let clock = FixedClock::at(test_now());
//! let authenticator =
//!     test_authenticator(ValidationPolicy::default(), &[("client123", 1)], clock.clone());
//!
//! let assertion = TestAssertionBuilder::for_client("client123", test_now()).sign_ed25519(1);
//! let params = assertion_params(&assertion);
//! ```

pub mod clock;
pub mod crypto_fixtures;
pub mod harness;
pub mod token_builders;

// Re-export commonly used items
pub use clock::*;
pub use crypto_fixtures::*;
pub use harness::*;
pub use token_builders::*;
