use core_types::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backing store could not be reached in time. Surfaced to callers as a
    /// degraded-service response; ingestion retries are up to the collaborator.
    #[error("The event store is unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Signal '{0}' was not found.")]
    NotFound(String),

    #[error("Signal '{0}' has already been resolved.")]
    AlreadyResolved(String),

    #[error("Signal '{0}' has already been recorded.")]
    Duplicate(String),

    #[error("Database query failed: {0}")]
    Query(sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("A stored row could not be decoded: {0}")]
    CorruptRow(String),
}

impl DbError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::StoreUnavailable(_))
    }
}

/// Connection-class failures become `StoreUnavailable`; everything else is a query error.
impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DbError::StoreUnavailable(e.to_string()),
            other => DbError::Query(other),
        }
    }
}
