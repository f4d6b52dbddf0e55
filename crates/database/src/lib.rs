//! # Vantage Database Crate
//!
//! This crate is the system's event store: the durable, append-mostly log of every inbound
//! query/response pair and of every trading signal's lifecycle.
//!
//! ## Architectural Principles
//!
//! - **Adapter behind a trait:** Callers depend on the `EventStore` trait only. The Postgres
//!   repository is the production backend; the in-memory store serves tests and local runs.
//! - **Readers never wait on writers:** Postgres MVCC on one side, sharded maps on the other.
//! - **Bounded latency:** `BoundedStore` puts a timeout on every call so a stuck database
//!   surfaces as `StoreUnavailable` instead of a hung request.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: pool setup and schema migrations.
//! - `EventStore`, `SharedStore`, `BoundedStore`: the store contract and its timeout wrapper.
//! - `PgEventStore`, `MemoryEventStore`: the two backends.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryEventStore;
pub use repository::PgEventStore;
pub use store::{BoundedStore, EventStore, SharedStore};

// Callers hold the pool for shutdown and for the shared cache backend.
pub use sqlx::PgPool;
