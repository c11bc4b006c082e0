use client_auth::authenticator::PrivateKeyJwtAuthenticator;
use client_auth::config::ServiceConfig;
use client_auth::handlers::client_auth_handler::AppState;
use client_auth::keys::StaticKeyResolver;
use client_auth::observability::metrics::init_metrics_recorder;
use client_auth::replay::InMemoryReplayCache;
use client_auth::routes;
use client_auth::tasks::replay_purger::spawn_replay_cache_purger;
use client_auth::validator::SystemClock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "client_auth=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting client authentication service");

    // Load configuration
    let config = ServiceConfig::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        prevent_token_reuse = config.policy.prevent_token_reuse,
        cache_used_jti = config.policy.cache_used_jti,
        reject_before_minutes = config.policy.reject_before_minutes,
        replay_cache_max_entries = ?config.replay_cache_max_entries,
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before any metric is recorded
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let keys = StaticKeyResolver::from_json_file(&config.client_keys_path).map_err(|e| {
        error!("Failed to load client keys: {}", e);
        e
    })?;

    info!(client_count = keys.len(), "Client keys loaded");

    let replay_cache = Arc::new(match config.replay_cache_max_entries {
        Some(max_entries) => InMemoryReplayCache::with_max_entries(max_entries),
        None => InMemoryReplayCache::new(),
    });
    let cancel_token = CancellationToken::new();
    let purger = spawn_replay_cache_purger(
        replay_cache.clone(),
        Arc::new(SystemClock),
        Duration::from_secs(config.replay_purge_interval_seconds),
        cancel_token.clone(),
    );

    let authenticator =
        PrivateKeyJwtAuthenticator::new(config.policy.clone(), Arc::new(keys), replay_cache);
    let state = Arc::new(AppState { authenticator });

    // Build application routes
    let app = routes::build_routes(state, Some(metrics_handle));

    // Parse bind address
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Client authentication service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel_token.cancel();
    if let Err(e) = purger.await {
        error!("Replay cache purger task failed: {}", e);
    }

    info!("Client authentication service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
