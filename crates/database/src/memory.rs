use crate::error::DbError;
use crate::store::EventStore;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{
    NewQueryEvent, NewSignal, QueryEvent, QueryFilter, SignalOutcome, SignalResolution, TimeWindow,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI64, Ordering};

/// An in-process event store.
///
/// Events and signals live in sharded maps, so an append only locks the shard it lands in
/// and readers of other shards proceed untouched. Nothing is persisted across restarts; the
/// Postgres repository is the durable backend.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: DashMap<i64, QueryEvent>,
    signals: DashMap<String, SignalOutcome>,
    next_id: AtomicI64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewQueryEvent) -> Result<i64, DbError> {
        let event = event.validate()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.events.insert(id, event.into_event(id));
        Ok(id)
    }

    async fn query(&self, filter: &QueryFilter) -> Result<Vec<QueryEvent>, DbError> {
        let now = Utc::now();
        let mut events: Vec<QueryEvent> = self
            .events
            .iter()
            .filter(|entry| filter.matches(entry.value(), now))
            .map(|entry| entry.value().clone())
            .collect();

        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        events.truncate(filter.effective_limit());
        Ok(events)
    }

    async fn events_between(&self, window: TimeWindow) -> Result<Vec<QueryEvent>, DbError> {
        Ok(self
            .events
            .iter()
            .filter(|entry| window.contains(entry.value().timestamp))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn record_signal(&self, signal: NewSignal) -> Result<SignalOutcome, DbError> {
        let outcome = signal.validate()?.into_outcome();
        match self.signals.entry(outcome.signal_id.clone()) {
            Entry::Occupied(_) => Err(DbError::Duplicate(outcome.signal_id)),
            Entry::Vacant(slot) => {
                slot.insert(outcome.clone());
                Ok(outcome)
            }
        }
    }

    async fn resolve_signal(
        &self,
        signal_id: &str,
        resolution: SignalResolution,
    ) -> Result<SignalOutcome, DbError> {
        // Holding the entry guard makes check-then-resolve atomic for this signal only.
        let mut entry = self
            .signals
            .get_mut(signal_id)
            .ok_or_else(|| DbError::NotFound(signal_id.to_string()))?;
        if entry.is_resolved() {
            return Err(DbError::AlreadyResolved(signal_id.to_string()));
        }
        entry.resolve(&resolution)?;
        Ok(entry.clone())
    }

    async fn get_signal(&self, signal_id: &str) -> Result<SignalOutcome, DbError> {
        self.signals
            .get(signal_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DbError::NotFound(signal_id.to_string()))
    }

    async fn signals_between(
        &self,
        window: TimeWindow,
        symbol: Option<&str>,
    ) -> Result<Vec<SignalOutcome>, DbError> {
        let symbol = symbol.map(str::to_ascii_uppercase);
        Ok(self
            .signals
            .iter()
            .filter(|entry| window.contains(entry.created_at))
            .filter(|entry| symbol.as_deref().is_none_or(|s| entry.symbol == s))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}
