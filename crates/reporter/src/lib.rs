//! # Vantage Report Composer
//!
//! This crate turns the event log into the analytics the API serves. It fetches records
//! through the `EventStore`, reduces them with the `AnalyticsEngine`, and memoizes every
//! result in the `CacheLayer`.
//!
//! ## Architectural Principles
//!
//! - **Explicit Construction:** `ReportService` is built once at startup from a store, a
//!   cache layer and the analytics settings, then shared by every handler.
//! - **No Silent Zeros:** A store failure fails the aggregation with a structured error.
//!   Only genuinely empty windows produce zero-valued summaries.
//! - **Fixed Rules:** The performance score weights and recommendation thresholds are
//!   named constants (`scoring`, `recommendations`), so the same summaries always yield
//!   the same report.
//!
//! ## Public API
//!
//! - `ReportService`: signal, query and interaction analytics, the comprehensive report,
//!   and the signal lifecycle writes that invalidate cached views.
//! - `ComprehensiveReport`: the composed, serializable report.
//! - `ScoreWeights` / `recommend`: the scoring and recommendation rules.
//! - `ReportError`: the error type returned by this crate.

pub mod error;
pub mod recommendations;
pub mod report;
pub mod scoring;
pub mod service;

pub use error::ReportError;
pub use recommendations::{LOW_EXECUTION_RATE, STRONG_WIN_RATE, recommend};
pub use report::ComprehensiveReport;
pub use scoring::ScoreWeights;
pub use service::{
    INTERACTIONS_NAMESPACE, QUERIES_NAMESPACE, REPORT_NAMESPACE, ReportService,
    SIGNALS_NAMESPACE,
};
