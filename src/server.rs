//! HTTP server initialization and runtime setup.
//!
//! Picks the storage, cache and geolocation backends, spawns the click
//! worker and runs the Axum server until a shutdown signal arrives.

use crate::application::services::ClickRecorder;
use crate::config::{CacheBackend, Config, GeoProvider};
use crate::domain::click_worker::run_click_worker;
use crate::domain::repositories::{DomainRepository, HistoryRepository, LinkRepository};
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::geo::{GeoLocator, IpApiLocator, NullLocator};
use crate::infrastructure::persistence::{
    MemoryStore, PgDomainRepository, PgHistoryRepository, PgLinkRepository,
};
use crate::routes::app_router;
use crate::state::{AppState, Backends, StateOptions};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

/// How long shutdown waits for queued visits to be written.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the memory cache backend drops expired entries.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL pool and migrations, or the in-memory store
/// - Redis or in-memory cache (or NullCache fallback)
/// - Geolocation provider
/// - Background click worker
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let storage = connect_storage(&config).await?;
    let cache = connect_cache(&config).await;
    let geo = geo_locator(&config)?;

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);

    let recorder = ClickRecorder::new(storage.history.clone(), geo)
        .with_geo_timeout(Duration::from_millis(config.geo_timeout_ms));
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        Arc::new(recorder),
        config.click_worker_concurrency,
    ));
    tracing::info!(
        "Click worker started (concurrency {})",
        config.click_worker_concurrency
    );

    let state = AppState::build(
        Backends {
            links: storage.links,
            domains: storage.domains,
            history: storage.history,
            cache,
        },
        click_tx,
        StateOptions {
            base_url: config.public_base_url.clone(),
            primary_hosts: config.all_primary_hosts(),
            code_length: config.code_length,
            cache_ttl_seconds: Some(config.cache_ttl_seconds),
            behind_proxy: config.behind_proxy,
        },
    );

    let app = app_router(state, config.behind_proxy)?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Every sender lived in the router, so the queue is closed now.
    tracing::info!("Server stopped, draining click queue");
    match tokio::time::timeout(DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Click worker failed: {}", e),
        Err(_) => tracing::warn!(
            "Click queue not drained within {}s, remaining visits are lost",
            DRAIN_TIMEOUT.as_secs()
        ),
    }

    Ok(())
}

struct Storage {
    links: Arc<dyn LinkRepository>,
    domains: Arc<dyn DomainRepository>,
    history: Arc<dyn HistoryRepository>,
}

async fn connect_storage(config: &Config) -> Result<Storage> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("No database configured, using the in-memory store");
        let store = Arc::new(MemoryStore::new());
        return Ok(Storage {
            links: store.clone(),
            domains: store.clone(),
            history: store,
        });
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations applied");

    let pool = Arc::new(pool);
    Ok(Storage {
        links: Arc::new(PgLinkRepository::new(pool.clone())),
        domains: Arc::new(PgDomainRepository::new(pool.clone())),
        history: Arc::new(PgHistoryRepository::new(pool)),
    })
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    match (config.cache_backend, &config.redis_url) {
        (CacheBackend::Redis, Some(redis_url)) => {
            match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                    Arc::new(NullCache::new())
                }
            }
        }
        (CacheBackend::Memory, _) => {
            let cache = Arc::new(MemoryCache::with_capacity(
                config.cache_ttl_seconds,
                config.cache_max_entries,
            ));
            spawn_cache_sweeper(Arc::downgrade(&cache));
            tracing::info!("Cache enabled (in-memory, max {} entries)", config.cache_max_entries);
            cache
        }
        _ => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
    }
}

/// Periodically drops expired memory cache entries; stops once the cache is gone.
fn spawn_cache_sweeper(cache: Weak<MemoryCache>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(cache) = cache.upgrade() else {
                break;
            };
            cache.purge_expired();
        }
    });
}

fn geo_locator(config: &Config) -> Result<Arc<dyn GeoLocator>> {
    match config.geo_provider {
        GeoProvider::IpApi => {
            let locator = IpApiLocator::new(Duration::from_millis(config.geo_timeout_ms))
                .context("Failed to build geolocation client")?;
            tracing::info!("Geolocation enabled (ip-api.com)");
            Ok(Arc::new(locator))
        }
        GeoProvider::None => {
            tracing::info!("Geolocation disabled, countries are recorded as Unknown");
            Ok(Arc::new(NullLocator))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
