use thiserror::Error;

/// Failures of a cache backend. These never reach callers of the cache layer, which
/// degrades to its in-process memo instead.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend is unavailable: {0}")]
    Unavailable(String),

    #[error("Cache backend query failed: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("Cached value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}
