use sqlx::{PgPool, migrate::Migrator};

use crate::cache::CacheService;
use crate::memory::MemoryStatsStore;

/// Compile-time discovered SQLx migrations for the `sidequest-database` crate.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Backend holding the authoritative stats records.
#[derive(Clone, Debug)]
pub enum StatsStore {
    Postgres(PgPool),
    Memory(MemoryStatsStore),
}

/// Shared database handle passed across crates.
#[derive(Clone, Debug)]
pub struct Database {
    store: StatsStore,
    cache: CacheService,
}

impl Database {
    /// Create a database handle from an existing pool and cache service.
    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self {
            store: StatsStore::Postgres(pool),
            cache,
        }
    }

    /// Create a process-local database handle with no external services.
    pub fn in_memory() -> Self {
        Self::with_memory_store(MemoryStatsStore::new())
    }

    /// Create a database handle over an existing in-memory store.
    pub fn with_memory_store(store: MemoryStatsStore) -> Self {
        Self {
            store: StatsStore::Memory(store),
            cache: CacheService::disabled("sidequest:memory"),
        }
    }

    /// Expose the stats backend for query modules.
    pub fn store(&self) -> &StatsStore {
        &self.store
    }

    /// The Postgres pool, when this handle is backed by Postgres.
    pub fn pool(&self) -> Option<&PgPool> {
        match &self.store {
            StatsStore::Postgres(pool) => Some(pool),
            StatsStore::Memory(_) => None,
        }
    }

    /// Expose the cache service for query modules.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}
