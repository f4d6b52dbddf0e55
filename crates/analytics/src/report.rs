use crate::buckets::ConfidenceBucket;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signal performance over a trailing window, optionally narrowed to one symbol.
///
/// This is the payload of the signal analytics endpoint and the `signals` section of the
/// comprehensive report. All rates are percentages rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub period_days: u32,
    pub symbol: Option<String>,
    pub summary: SignalStats,
    pub best_trade: Option<TradeRecord>,
    pub worst_trade: Option<TradeRecord>,
    /// Ranked by win rate, then signal count, then symbol.
    pub top_symbols: Vec<SymbolPerformance>,
    /// Only non-empty bands, highest band first.
    pub confidence_distribution: Vec<BucketStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub total_signals: u64,
    pub executed_signals: u64,
    pub winning_signals: u64,
    pub losing_signals: u64,
    /// Resolved without execution.
    pub expired_signals: u64,
    /// Not yet resolved.
    pub pending_signals: u64,
    pub execution_rate: Decimal,
    pub win_rate: Decimal,
    pub avg_confidence: Decimal,
    pub total_pnl_pct: Decimal,
    pub avg_pnl_pct: Decimal,
    pub avg_risk_reward: Decimal,
}

/// A single executed signal, surfaced as the best or worst trade of a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub signal_id: String,
    pub symbol: String,
    pub timeframe: String,
    pub confidence: Option<Decimal>,
    pub pnl_pct: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub signals: u64,
    pub executed: u64,
    pub wins: u64,
    pub win_rate: Decimal,
    pub avg_confidence: Decimal,
    pub avg_pnl_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub bucket: ConfidenceBucket,
    pub range: String,
    pub count: u64,
    pub executed: u64,
    pub wins: u64,
    pub win_rate: Decimal,
}

/// Query traffic over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    pub period_days: u32,
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub success_rate: Decimal,
    pub avg_duration_ms: Decimal,
    pub cache_hits: u64,
    pub cache_hit_rate: Decimal,
    pub by_source: Vec<RankedCount>,
    pub by_category: Vec<RankedCount>,
    pub top_endpoints: Vec<RankedCount>,
}

/// An identifier and how many events carried it. Ranked by count, ties by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCount {
    pub name: String,
    pub count: u64,
}

/// Who used the API over a trailing window, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSummary {
    pub period_days: u32,
    pub total_interactions: u64,
    pub unique_users: u64,
    pub unique_sessions: u64,
    pub avg_interactions_per_user: Decimal,
    /// One entry per UTC day with traffic, oldest first.
    pub daily_volume: Vec<DailyVolume>,
    pub busiest_day: Option<DailyVolume>,
    pub top_users: Vec<RankedCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub count: u64,
}
