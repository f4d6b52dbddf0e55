use thiserror::Error;

/// Raised when an inbound event or signal is malformed. Never retried: the caller
/// has to resubmit corrected data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for '{field}': {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
