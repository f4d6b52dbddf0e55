use analytics::{InteractionSummary, QuerySummary, SignalSummary};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Every facet of the analytics for one window, scored and annotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub period_days: u32,
    pub generated_at: DateTime<Utc>,
    pub performance_score: Decimal,
    pub recommendations: Vec<String>,
    pub signals: SignalSummary,
    pub queries: QuerySummary,
    pub interactions: InteractionSummary,
}
