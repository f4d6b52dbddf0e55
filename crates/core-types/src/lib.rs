//! # Vantage Core Types
//!
//! The foundational data structures shared by every other crate in the workspace:
//! the `QueryEvent` written for each inbound request, the `SignalOutcome` tracked
//! across a trading signal's lifecycle, and the filters and windows used to read them back.
//!
//! This crate has no knowledge of storage, caching or HTTP. Validation lives here so
//! that every ingestion path rejects malformed input the same way.

pub mod enums;
pub mod error;
pub mod metadata;
pub mod structs;
pub mod window;

// Re-export the core types to provide a clean public API.
pub use enums::{QueryCategory, QuerySource};
pub use error::ValidationError;
pub use metadata::{MetaValue, Metadata};
pub use structs::{
    MAX_PNL_PCT, MAX_RISK_REWARD, MAX_SIGNAL_ID_LEN, MAX_TEXT_BYTES, NewQueryEvent, NewSignal,
    QueryEvent, QueryFilter, SignalOutcome, SignalResolution,
};
pub use window::TimeWindow;
