//! HTTP server initialization and runtime setup.
//!
//! Handles storage wiring, cache setup, worker spawning, and the Axum
//! server lifecycle.

use crate::config::{Config, StorageBackend};
use crate::domain::click_worker::run_click_retry_worker;
use crate::domain::repositories::{ClickRepository, LinkRepository, TokenRepository};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::{
    MemoryClickRepository, MemoryLinkRepository, MemoryStore, MemoryTokenRepository,
    PgClickRepository, PgLinkRepository, PgTokenRepository,
};
use crate::routes::app_router;
use crate::state::{AppState, StateSettings};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend (PostgreSQL pool + migrations, or in-memory)
/// - Redis cache (or NullCache fallback)
/// - Background click retry worker
/// - Axum HTTP server
///
/// # Errors
///
/// Returns an error if storage connection, migration, bind, or serving
/// fails.
pub async fn run(config: Config) -> Result<()> {
    let (links, clicks, tokens): (
        Arc<dyn LinkRepository>,
        Arc<dyn ClickRepository>,
        Arc<dyn TokenRepository>,
    ) = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = connect_pool(&config).await?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;

            (
                Arc::new(PgLinkRepository::new(pool.clone())),
                Arc::new(PgClickRepository::new(pool.clone())),
                Arc::new(PgTokenRepository::new(pool)),
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, all data is lost on shutdown");
            let store = MemoryStore::new();
            (
                Arc::new(MemoryLinkRepository::new(Arc::clone(&store))),
                Arc::new(MemoryClickRepository::new(store)),
                Arc::new(MemoryTokenRepository::new()),
            )
        }
    };

    let cache: Arc<dyn CacheService> = if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache)
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache)
    };

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    tokio::spawn(run_click_retry_worker(click_rx, Arc::clone(&clicks)));
    tracing::info!("Click retry worker started");

    let state = AppState::assemble(
        links,
        clicks,
        tokens,
        cache,
        click_tx,
        StateSettings {
            base_url: config.base_url.clone(),
            code_length: config.code_length,
            require_expiry: config.require_expiry,
            token_signing_secret: config.token_signing_secret.clone(),
            api_token: config.api_token.clone(),
        },
    );

    let app = app_router(state, config.behind_proxy);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .await?;

    Ok(())
}

/// Connects the PostgreSQL pool with the configured limits.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres backend")?;

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}
