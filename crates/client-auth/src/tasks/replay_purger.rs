//! Replay cache purger background task.
//!
//! Expired replay cache entries are already ignored on lookup. This task only
//! reclaims their memory at a fixed interval.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is cancelled.

use crate::observability::metrics::record_replay_cache_purged;
use crate::replay::ReplayCache;
use crate::validator::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Run the purge loop until `cancel_token` is cancelled.
#[instrument(skip_all, name = "client_auth.task.replay_purger")]
pub async fn start_replay_cache_purger(
    cache: Arc<dyn ReplayCache>,
    clock: Arc<dyn Clock>,
    purge_interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "client_auth.task.replay_purger",
        purge_interval_seconds = purge_interval.as_secs(),
        "Starting replay cache purger task"
    );

    let mut interval = tokio::time::interval(purge_interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = cache.purge_expired(clock.now());
                if purged > 0 {
                    debug!(
                        target: "client_auth.task.replay_purger",
                        purged = purged,
                        "Purged expired replay cache entries"
                    );
                    record_replay_cache_purged(purged);
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "client_auth.task.replay_purger",
                    "Replay cache purger received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(
        target: "client_auth.task.replay_purger",
        "Replay cache purger stopped"
    );
}

/// Spawn [`start_replay_cache_purger`] on the current runtime.
pub fn spawn_replay_cache_purger(
    cache: Arc<dyn ReplayCache>,
    clock: Arc<dyn Clock>,
    purge_interval: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(start_replay_cache_purger(
        cache,
        clock,
        purge_interval,
        cancel_token,
    ))
}
