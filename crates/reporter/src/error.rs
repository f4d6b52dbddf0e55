use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Event store error: {0}")]
    Store(#[from] database::DbError),
}

impl ReportError {
    /// True when the report failed because the store could not be reached in time.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ReportError::Store(e) => e.is_unavailable(),
        }
    }
}
