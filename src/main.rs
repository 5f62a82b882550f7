use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodflix_api::{
    api::{create_router, AppState},
    config::{Config, StoreBackend},
    db::{create_pool, create_redis_client, Cache, InMemoryUserStore, PgUserStore, UserStore},
    services::{accounts::SESSION_SWEEP_INTERVAL, providers::TmdbProvider, EmotionClassifier},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("moodflix_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn UserStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            Arc::new(PgUserStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, accounts are lost on restart");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client);

    let provider = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    ));

    let face_path = config.face_cascade_path.clone();
    let smile_path = config.smile_cascade_path.clone();
    let classifier = tokio::task::spawn_blocking(move || {
        EmotionClassifier::from_cascade_files(face_path, smile_path)
    })
    .await
    .context("Cascade loading task failed")?;

    let state = AppState::new(
        provider,
        store,
        classifier,
        config.tmdb_image_base_url.clone(),
        config.session_ttl_secs,
    );
    let session_sweeper = state.accounts.spawn_session_sweeper(SESSION_SWEEP_INTERVAL);
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session_sweeper.abort();
    cache_handle.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
