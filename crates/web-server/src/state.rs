use crate::interceptor::RecordTasks;
use cache::{CacheLayer, PgCache};
use configuration::{AnalyticsSettings, Config, StorageBackend};
use database::{BoundedStore, DbError, MemoryEventStore, PgEventStore, PgPool, SharedStore};
use reporter::ReportService;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// How long shutdown waits for in-flight query event appends.
const RECORD_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// The shared application state that all handlers can access.
///
/// Built once at startup and torn down explicitly at shutdown. Cloning is cheap; every
/// field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// The event store, with every call bounded by `store.timeout_ms`.
    pub store: SharedStore,
    pub reports: ReportService,
    /// Appends started by the interceptor that have not finished yet.
    pub records: RecordTasks,
    pool: Option<PgPool>,
}

impl AppState {
    /// Assembles the state from an already-constructed store and cache.
    pub fn new(store: SharedStore, cache: CacheLayer, analytics: AnalyticsSettings) -> Self {
        Self {
            reports: ReportService::new(store.clone(), cache, analytics),
            store,
            records: RecordTasks::default(),
            pool: None,
        }
    }

    /// Connects the configured backends, runs migrations when Postgres is involved and
    /// wires the store and cache into a report service.
    pub async fn build(config: &Config) -> Result<Self, DbError> {
        let needs_pool = config.store.backend == StorageBackend::Postgres
            || config.cache.backend == StorageBackend::Postgres;
        let pool = if needs_pool {
            let pool = database::connect(&config.database).await?;
            database::run_migrations(&pool).await?;
            Some(pool)
        } else {
            None
        };

        let raw_store: SharedStore = match (&pool, config.store.backend) {
            (Some(pool), StorageBackend::Postgres) => Arc::new(PgEventStore::new(pool.clone())),
            _ => Arc::new(MemoryEventStore::default()),
        };
        let store: SharedStore = Arc::new(BoundedStore::new(raw_store, config.store.timeout()));

        let cache = match (&pool, config.cache.backend) {
            (Some(pool), StorageBackend::Postgres) => CacheLayer::new(
                Arc::new(PgCache::new(pool.clone())),
                config.cache.timeout(),
                config.cache.ttl(),
            ),
            _ => CacheLayer::in_process(config.cache.ttl()),
        };

        info!(
            store = ?config.store.backend,
            cache = cache.backend_name(),
            ttl_secs = config.cache.ttl_secs,
            "Application state built."
        );

        let mut state = Self::new(store, cache, config.analytics.clone());
        state.pool = pool;
        Ok(state)
    }

    /// Waits for in-flight query event appends, then closes the database pool, if one
    /// was opened.
    pub async fn shutdown(&self) {
        let drained = self.records.drain(RECORD_DRAIN_GRACE).await;
        if drained > 0 {
            info!(drained, "Flushed pending query events.");
        }
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("Database pool closed.");
        }
    }

    /// Spawns the task that periodically drops expired cache entries.
    pub fn spawn_cache_purge(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.reports.cache().clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired cache entries.");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{NewQueryEvent, QuerySource};
    use database::EventStore;

    #[tokio::test]
    async fn shutdown_flushes_pending_query_events() {
        let store = Arc::new(MemoryEventStore::default());
        let state = AppState::new(
            store.clone(),
            CacheLayer::in_process(cache::DEFAULT_TTL),
            AnalyticsSettings::default(),
        );
        for i in 0..3 {
            let event = NewQueryEvent::new(format!("query {i}"), QuerySource::DirectApi, "/api/queries");
            state.records.record(state.store.clone(), event);
        }

        state.shutdown().await;
        assert_eq!(store.event_count(), 3);
        assert_eq!(state.records.pending(), 0);
        assert!(store.ping().await.is_ok());
    }
}
