//! Metrics for client authentication.
//!
//! All metrics use the `client_auth_` prefix and Prometheus naming
//! conventions (`_total` for counters, `_seconds` for durations).
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (accepted, rejected)
//! - `reason`: fixed set from `RejectionReason::as_str`, plus `none`
//! - `endpoint`: 2 values (token, backchannel)
//! - `outcome`: 4 values (accepted, rejected, invalid_request, ineligible)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder. Must be called once, before any metric is
/// recorded, and before the runtime starts serving requests.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Signature verification plus claim checks; no network I/O
        .set_buckets_for_metric(
            Matcher::Prefix("client_auth_assertion_validation".to_string()),
            &[
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.010, 0.025, 0.050,
            ],
        )
        .map_err(|e| format!("Failed to set validation duration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record an assertion validation outcome.
///
/// Metrics: `client_auth_assertion_validations_total`,
/// `client_auth_assertion_validation_duration_seconds`
/// Labels: `status`, `reason`
pub fn record_assertion_validation(status: &'static str, reason: &'static str, duration: Duration) {
    counter!("client_auth_assertion_validations_total", "status" => status, "reason" => reason)
        .increment(1);

    histogram!("client_auth_assertion_validation_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}

/// Record entries reclaimed by the replay cache purger.
///
/// Metric: `client_auth_replay_cache_purged_total`
pub fn record_replay_cache_purged(count: usize) {
    counter!("client_auth_replay_cache_purged_total").increment(count as u64);
}

/// Record an HTTP authentication request.
///
/// Metric: `client_auth_requests_total`
/// Labels: `endpoint`, `outcome`
pub fn record_request(endpoint: &'static str, outcome: &'static str) {
    counter!("client_auth_requests_total", "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
}
