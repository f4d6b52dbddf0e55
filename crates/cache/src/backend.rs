use crate::error::CacheError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// A key-value store for serialized aggregation results with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the value if present and not yet expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Deletes every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, CacheError>;

    fn name(&self) -> &'static str;
}

/// The in-process memo. Used directly when no shared backend is configured and as the
/// fallback whenever the shared backend cannot be reached.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, (Instant, Value)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .and_then(|entry| (entry.0 > now).then(|| entry.1.clone()));
        if hit.is_none() {
            // Drop the stale entry eagerly; the guard above is released by now.
            self.entries.remove_if(key, |_, (expires_at, _)| *expires_at <= now);
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (Instant::now() + ttl, value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
