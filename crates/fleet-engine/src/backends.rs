//! Backend selection.
//!
//! Storage and cache are chosen by configuration. The `PostgreSQL` pool is
//! opened lazily, so a database that is down at boot does not stop the
//! read API from coming up; it is migrated during seeding, where failures
//! are retried and then only keep the simulator from starting. The cache
//! is best effort, so an unreachable `Dragonfly` falls back to the
//! in-process cache with a warning.

use std::sync::Arc;

use fleet_core::cache::FleetCache;
use fleet_core::config::{
    CacheBackend, CacheConfig, SeedingConfig, StorageBackend, StorageConfig,
};
use fleet_core::memory::{InMemoryCache, InMemoryRepository};
use fleet_core::repository::FleetRepository;
use fleet_db::{DragonflyCache, PostgresConfig, PostgresPool};
use tracing::{info, warn};

use crate::error::EngineError;

/// The persistence store and cache the engine runs against.
pub struct Backends {
    /// Store shared by the sink and the read API.
    pub repository: Arc<dyn FleetRepository>,
    /// Cache shared by the sink and the read API.
    pub cache: Arc<dyn FleetCache>,
    /// Kept so the pool can be closed on shutdown.
    pub postgres: Option<PostgresPool>,
}

impl Backends {
    /// Connect the configured backends.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] if `PostgreSQL` is selected and its
    /// URL cannot be parsed. Reachability is not checked here.
    pub async fn connect(storage: &StorageConfig, cache: &CacheConfig) -> Result<Self, EngineError> {
        let mut postgres = None;
        let repository: Arc<dyn FleetRepository> = match storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory store with demo roster");
                Arc::new(InMemoryRepository::with_demo_fleet())
            }
            StorageBackend::Postgres => {
                let pool = PostgresPool::connect_lazy(&PostgresConfig::from_storage(storage))?;
                let repository = Arc::new(pool.repository());
                postgres = Some(pool);
                repository
            }
        };

        let cache: Arc<dyn FleetCache> = match cache.backend {
            CacheBackend::Memory => {
                info!("Using in-memory cache");
                Arc::new(InMemoryCache::new())
            }
            CacheBackend::Dragonfly => match DragonflyCache::connect(&cache.dragonfly_url).await {
                Ok(dragonfly) => Arc::new(dragonfly),
                Err(e) => {
                    warn!(error = %e, "Dragonfly unavailable, falling back to in-memory cache");
                    Arc::new(InMemoryCache::new())
                }
            },
        };

        Ok(Self {
            repository,
            cache,
            postgres,
        })
    }

    /// Bring the store's schema up to date, retrying on the seeding
    /// schedule. A no-op for the in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] with the last failure once
    /// `seeding.max_attempts` migrations have failed.
    pub async fn migrate(&self, seeding: &SeedingConfig) -> Result<(), EngineError> {
        let Some(pool) = &self.postgres else {
            return Ok(());
        };
        let max_attempts = seeding.max_attempts.max(1);
        let mut attempt: u32 = 1;
        loop {
            match pool.run_migrations().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= max_attempts => return Err(e.into()),
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        retry_in_ms = seeding.retry_delay_ms,
                        error = %e,
                        "Schema migration failed, retrying"
                    );
                    tokio::time::sleep(seeding.retry_delay()).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// Release pooled connections.
    pub async fn close(&self) {
        if let Some(pool) = &self.postgres {
            pool.close().await;
        }
    }
}
