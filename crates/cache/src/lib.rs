//! # Vantage Cache Layer
//!
//! Time-bounded memoization for expensive analytics aggregations.
//!
//! - `CacheLayer::get_or_compute` is the single entry point. Keys come from `CacheKey`,
//!   which derives them deterministically from an aggregation's filter parameters.
//! - `PgCache` is the shared backend used by every worker; `MemoryCache` is the in-process
//!   memo the layer falls back to when the shared backend is unreachable or slow.
//! - Cache failures are never surfaced. They are logged at debug level and the layer
//!   degrades to direct computation.

pub mod backend;
pub mod error;
pub mod key;
pub mod layer;
pub mod postgres;

pub use backend::{CacheBackend, MemoryCache};
pub use error::CacheError;
pub use key::CacheKey;
pub use layer::{CacheLayer, DEFAULT_TIMEOUT, DEFAULT_TTL};
pub use postgres::PgCache;
