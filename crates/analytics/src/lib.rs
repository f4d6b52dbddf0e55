//! # Vantage Analytics Engine
//!
//! This crate turns the raw event log into the statistics the API reports: signal
//! win-rates, execution-rates and confidence distributions, query traffic breakdowns and
//! user interaction volume.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** This crate has no knowledge of storage, caching or HTTP. It depends
//!   only on `core-types`; fetching records and memoizing results belong to the reporter.
//! - **Stateless Calculation:** `AnalyticsEngine` takes records and a reference time and
//!   returns a summary. The same input always produces the same output, which keeps every
//!   statistic testable without a database.
//! - **Exact Arithmetic:** Rates, means and P/L use `rust_decimal` and are rounded to two
//!   decimal places. A zero denominator yields zero, never an error.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: signal, query and interaction aggregations.
//! - `SignalSummary`, `QuerySummary`, `InteractionSummary`: the serializable results.
//! - `ConfidenceBucket` / `CONFIDENCE_BANDS`: the fixed confidence bands.

pub mod buckets;
pub mod engine;
pub mod report;
pub mod stats;

pub use buckets::{CONFIDENCE_BANDS, ConfidenceBucket};
pub use engine::{AnalyticsEngine, DEFAULT_TOP_N};
pub use report::{
    BucketStats, DailyVolume, InteractionSummary, QuerySummary, RankedCount, SignalStats,
    SignalSummary, SymbolPerformance, TradeRecord,
};
pub use stats::{REPORT_DP, mean, percentage, round_report};
