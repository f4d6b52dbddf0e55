use crate::backend::{CacheBackend, MemoryCache};
use crate::error::CacheError;
use crate::key::CacheKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default time-to-live of cached analytics results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Upper bound on a backend call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

/// Memoizes expensive aggregations behind a time-bounded cache.
///
/// The layer talks to an optional shared backend. Whenever that backend errors or does not
/// answer within `timeout`, the layer carries on with its in-process memo, which follows the
/// same TTL rules. Callers can only notice the difference in latency.
///
/// Concurrent misses on the same key may each run their computation. Aggregations are
/// pure reads, so the only cost is duplicated work.
#[derive(Clone)]
pub struct CacheLayer {
    primary: Option<Arc<dyn CacheBackend>>,
    fallback: Arc<MemoryCache>,
    timeout: Duration,
    default_ttl: Duration,
}

impl CacheLayer {
    /// A layer backed by a shared cache, with the in-process memo as fallback.
    pub fn new(primary: Arc<dyn CacheBackend>, timeout: Duration, default_ttl: Duration) -> Self {
        Self {
            primary: Some(primary),
            fallback: Arc::new(MemoryCache::new()),
            timeout,
            default_ttl,
        }
    }

    /// A layer that only uses the in-process memo.
    pub fn in_process(default_ttl: Duration) -> Self {
        Self {
            primary: None,
            fallback: Arc::new(MemoryCache::new()),
            timeout: DEFAULT_TIMEOUT,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.primary.as_ref().map_or("memory", |p| p.name())
    }

    /// Returns the cached value for `key` if it is still fresh; otherwise runs `compute`,
    /// caches its result for `ttl` and returns it. `no_cache` skips the lookup but still
    /// refreshes the entry.
    ///
    /// Errors from `compute` are returned unchanged and never cached. Cache failures are
    /// never returned.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        no_cache: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if !no_cache {
            if let Some(value) = self.lookup(key).await {
                match serde_json::from_value::<T>(value) {
                    Ok(hit) => {
                        tracing::debug!(key = %key, "Cache hit.");
                        return Ok(hit);
                    }
                    Err(e) => {
                        tracing::debug!(key = %key, error = %e, "Cached value has an unexpected shape; recomputing.");
                    }
                }
            }
        }

        tracing::debug!(key = %key, no_cache, "Cache miss; computing.");
        let value = compute().await?;
        match serde_json::to_value(&value) {
            Ok(json) => self.store(key, json, ttl).await,
            Err(e) => tracing::debug!(key = %key, error = %e, "Result is not cacheable."),
        }
        Ok(value)
    }

    /// Removes a single entry.
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Some(primary) = &self.primary {
            self.bounded("delete", primary.delete(key.as_str())).await;
        }
        let _ = self.fallback.delete(key.as_str()).await;
    }

    /// Removes every entry in `namespace`.
    pub async fn invalidate_namespace(&self, namespace: &str) {
        let prefix = CacheKey::namespace_prefix(namespace);
        if let Some(primary) = &self.primary {
            self.bounded("delete_prefix", primary.delete_prefix(&prefix)).await;
        }
        let _ = self.fallback.delete_prefix(&prefix).await;
        tracing::debug!(namespace, "Cache namespace invalidated.");
    }

    /// Drops expired entries from both the shared backend and the memo.
    pub async fn purge_expired(&self) -> u64 {
        let mut purged = 0;
        if let Some(primary) = &self.primary {
            purged += self
                .bounded("purge_expired", primary.purge_expired())
                .await
                .unwrap_or(0);
        }
        purged + self.fallback.purge_expired().await.unwrap_or(0)
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Value> {
        if let Some(primary) = &self.primary {
            if let Some(result) = self.bounded("get", primary.get(key.as_str())).await {
                return result;
            }
        }
        self.fallback.get(key.as_str()).await.ok().flatten()
    }

    async fn store(&self, key: &CacheKey, value: Value, ttl: Duration) {
        if let Some(primary) = &self.primary {
            if self
                .bounded("set", primary.set(key.as_str(), value.clone(), ttl))
                .await
                .is_some()
            {
                return;
            }
        }
        let _ = self.fallback.set(key.as_str(), value, ttl).await;
    }

    /// Runs a backend call under the timeout. `None` means the backend was unavailable;
    /// that is logged at debug level and otherwise swallowed.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::debug!(operation, error = %e, "Cache backend unavailable; using in-process memo.");
                None
            }
            Err(_) => {
                tracing::debug!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Cache backend timed out; using in-process memo."
                );
                None
            }
        }
    }
}
