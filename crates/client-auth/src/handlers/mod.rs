pub mod client_auth_handler;
pub mod metrics;
