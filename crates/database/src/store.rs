use crate::error::DbError;
use async_trait::async_trait;
use core_types::{
    NewQueryEvent, NewSignal, QueryEvent, QueryFilter, SignalOutcome, SignalResolution, TimeWindow,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The durable, append-mostly log of query events and signal outcomes.
///
/// Implementations must let reads proceed while appends are in flight; no call may hold
/// a store-wide lock that blocks the other side.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Validates and persists a query event, returning its identifier once durable.
    async fn append(&self, event: NewQueryEvent) -> Result<i64, DbError>;

    /// Recent events matching the filter, newest first, capped at the filter's limit.
    async fn query(&self, filter: &QueryFilter) -> Result<Vec<QueryEvent>, DbError>;

    /// Every event inside the window, in no particular order. Used for aggregation.
    async fn events_between(&self, window: TimeWindow) -> Result<Vec<QueryEvent>, DbError>;

    /// Records a freshly emitted signal. Fails with `Duplicate` if the id is taken.
    async fn record_signal(&self, signal: NewSignal) -> Result<SignalOutcome, DbError>;

    /// Resolves a signal exactly once.
    async fn resolve_signal(
        &self,
        signal_id: &str,
        resolution: SignalResolution,
    ) -> Result<SignalOutcome, DbError>;

    async fn get_signal(&self, signal_id: &str) -> Result<SignalOutcome, DbError>;

    /// Signals created inside the window, optionally restricted to one symbol.
    async fn signals_between(
        &self,
        window: TimeWindow,
        symbol: Option<&str>,
    ) -> Result<Vec<SignalOutcome>, DbError>;

    /// A cheap round-trip used by health checks.
    async fn ping(&self) -> Result<(), DbError>;
}

pub type SharedStore = Arc<dyn EventStore>;

/// Wraps any store so that no call can hang: each one either completes within `timeout`
/// or fails with `StoreUnavailable`.
#[derive(Clone)]
pub struct BoundedStore {
    inner: SharedStore,
    timeout: Duration,
}

impl BoundedStore {
    pub fn new(inner: SharedStore, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T: Send>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DbError>> + Send,
    ) -> Result<T, DbError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Event store call timed out."
                );
                Err(DbError::StoreUnavailable(format!(
                    "{operation} did not complete within {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl EventStore for BoundedStore {
    async fn append(&self, event: NewQueryEvent) -> Result<i64, DbError> {
        self.bounded("append", self.inner.append(event)).await
    }

    async fn query(&self, filter: &QueryFilter) -> Result<Vec<QueryEvent>, DbError> {
        self.bounded("query", self.inner.query(filter)).await
    }

    async fn events_between(&self, window: TimeWindow) -> Result<Vec<QueryEvent>, DbError> {
        self.bounded("events_between", self.inner.events_between(window))
            .await
    }

    async fn record_signal(&self, signal: NewSignal) -> Result<SignalOutcome, DbError> {
        self.bounded("record_signal", self.inner.record_signal(signal))
            .await
    }

    async fn resolve_signal(
        &self,
        signal_id: &str,
        resolution: SignalResolution,
    ) -> Result<SignalOutcome, DbError> {
        self.bounded(
            "resolve_signal",
            self.inner.resolve_signal(signal_id, resolution),
        )
        .await
    }

    async fn get_signal(&self, signal_id: &str) -> Result<SignalOutcome, DbError> {
        self.bounded("get_signal", self.inner.get_signal(signal_id))
            .await
    }

    async fn signals_between(
        &self,
        window: TimeWindow,
        symbol: Option<&str>,
    ) -> Result<Vec<SignalOutcome>, DbError> {
        self.bounded("signals_between", self.inner.signals_between(window, symbol))
            .await
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.bounded("ping", self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEventStore;
    use chrono::Utc;

    /// Never answers: every call parks until the timeout fires.
    struct StalledStore;

    #[async_trait]
    impl EventStore for StalledStore {
        async fn append(&self, _event: NewQueryEvent) -> Result<i64, DbError> {
            std::future::pending().await
        }
        async fn query(&self, _filter: &QueryFilter) -> Result<Vec<QueryEvent>, DbError> {
            std::future::pending().await
        }
        async fn events_between(&self, _window: TimeWindow) -> Result<Vec<QueryEvent>, DbError> {
            std::future::pending().await
        }
        async fn record_signal(&self, _signal: NewSignal) -> Result<SignalOutcome, DbError> {
            std::future::pending().await
        }
        async fn resolve_signal(
            &self,
            _signal_id: &str,
            _resolution: SignalResolution,
        ) -> Result<SignalOutcome, DbError> {
            std::future::pending().await
        }
        async fn get_signal(&self, _signal_id: &str) -> Result<SignalOutcome, DbError> {
            std::future::pending().await
        }
        async fn signals_between(
            &self,
            _window: TimeWindow,
            _symbol: Option<&str>,
        ) -> Result<Vec<SignalOutcome>, DbError> {
            std::future::pending().await
        }
        async fn ping(&self) -> Result<(), DbError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_query_fails_as_unavailable() {
        let store = BoundedStore::new(Arc::new(StalledStore), Duration::from_millis(50));

        let err = store.query(&QueryFilter::default()).await.unwrap_err();
        assert!(err.is_unavailable());

        let err = store
            .events_between(TimeWindow::trailing_days(7, Utc::now()))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn responsive_store_passes_through() {
        let store = BoundedStore::new(
            Arc::new(MemoryEventStore::new()),
            Duration::from_secs(1),
        );
        store.ping().await.unwrap();
        let id = store
            .append(NewQueryEvent::new(
                "hello",
                core_types::QuerySource::TestHarness,
                "/api/test",
            ))
            .await
            .unwrap();
        assert_eq!(id, 1);
    }
}
