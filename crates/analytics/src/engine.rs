use crate::buckets::ConfidenceBucket;
use crate::report::{
    BucketStats, DailyVolume, InteractionSummary, QuerySummary, RankedCount, SignalStats,
    SignalSummary, SymbolPerformance, TradeRecord,
};
use crate::stats::{mean, percentage, saturating_add};
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{QueryEvent, SignalOutcome, TimeWindow};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// How many entries ranked lists (symbols, endpoints, users) keep by default.
pub const DEFAULT_TOP_N: usize = 10;

/// A stateless calculator for deriving usage and signal statistics from the event log.
///
/// Every method filters its input to the trailing window itself, so callers may pass a
/// superset of the records they want summarized. Given the same records and `now`, the
/// output is always identical.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    top_n: usize,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N }
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_n(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Signal performance over the trailing `days`, optionally narrowed to one symbol.
    ///
    /// # Arguments
    ///
    /// * `signals` - Signal lifecycle records; anything outside the window is ignored.
    /// * `days` - Length of the trailing window ending at `now`.
    /// * `symbol` - Case-insensitive symbol filter.
    pub fn signal_summary(
        &self,
        signals: &[SignalOutcome],
        days: u32,
        symbol: Option<&str>,
        now: DateTime<Utc>,
    ) -> SignalSummary {
        let window = TimeWindow::trailing_days(days, now);
        let symbol = symbol
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());

        let selected: Vec<&SignalOutcome> = signals
            .iter()
            .filter(|s| window.contains(s.created_at))
            .filter(|s| {
                symbol
                    .as_deref()
                    .is_none_or(|wanted| s.symbol.eq_ignore_ascii_case(wanted))
            })
            .collect();

        let mut overall = Tally::default();
        let mut per_symbol: BTreeMap<&str, Tally> = BTreeMap::new();
        let mut per_bucket: BTreeMap<ConfidenceBucket, Tally> = BTreeMap::new();

        for signal in &selected {
            overall.add(signal);
            per_symbol.entry(signal.symbol.as_str()).or_default().add(signal);
            if let Some(confidence) = signal.confidence {
                per_bucket
                    .entry(ConfidenceBucket::for_score(confidence))
                    .or_default()
                    .add(signal);
            }
        }

        debug!(
            signals = selected.len(),
            days,
            symbol = symbol.as_deref().unwrap_or("*"),
            "Computed signal summary"
        );

        SignalSummary {
            period_days: days,
            summary: overall.stats(),
            best_trade: extreme_trade(&selected, Ordering::Greater),
            worst_trade: extreme_trade(&selected, Ordering::Less),
            top_symbols: self.rank_symbols(per_symbol),
            confidence_distribution: per_bucket
                .into_iter()
                .map(|(bucket, tally)| BucketStats {
                    bucket,
                    range: bucket.range().to_string(),
                    count: tally.signals,
                    executed: tally.executed,
                    wins: tally.wins,
                    win_rate: tally.win_rate(),
                })
                .collect(),
            symbol,
        }
    }

    /// Query traffic over the trailing `days`.
    pub fn query_summary(&self, events: &[QueryEvent], days: u32, now: DateTime<Utc>) -> QuerySummary {
        let window = TimeWindow::trailing_days(days, now);
        let selected: Vec<&QueryEvent> = events.iter().filter(|e| window.contains(e.timestamp)).collect();

        let total = selected.len() as u64;
        let successful = selected.iter().filter(|e| e.success).count() as u64;
        let cache_hits = selected.iter().filter(|e| e.cache_hit).count() as u64;
        let duration_sum = selected
            .iter()
            .map(|e| Decimal::from(e.duration_ms))
            .fold(Decimal::ZERO, saturating_add);

        let mut by_source: HashMap<&str, u64> = HashMap::new();
        let mut by_category: HashMap<&str, u64> = HashMap::new();
        let mut by_endpoint: HashMap<&str, u64> = HashMap::new();
        for event in &selected {
            *by_source.entry(event.source.as_str()).or_default() += 1;
            *by_category.entry(event.category.as_str()).or_default() += 1;
            *by_endpoint.entry(event.endpoint.as_str()).or_default() += 1;
        }

        debug!(queries = total, days, "Computed query summary");

        QuerySummary {
            period_days: days,
            total_queries: total,
            successful_queries: successful,
            failed_queries: total - successful,
            success_rate: percentage(successful, total),
            avg_duration_ms: mean(duration_sum, total),
            cache_hits,
            cache_hit_rate: percentage(cache_hits, total),
            by_source: rank_counts(by_source, None),
            by_category: rank_counts(by_category, None),
            top_endpoints: rank_counts(by_endpoint, Some(self.top_n)),
        }
    }

    /// Who used the API over the trailing `days`, and on which UTC days.
    pub fn interaction_summary(
        &self,
        events: &[QueryEvent],
        days: u32,
        now: DateTime<Utc>,
    ) -> InteractionSummary {
        let window = TimeWindow::trailing_days(days, now);

        let mut total = 0u64;
        let mut attributed = 0u64;
        let mut users: HashMap<&str, u64> = HashMap::new();
        let mut sessions: HashSet<&str> = HashSet::new();
        let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();

        for event in events.iter().filter(|e| window.contains(e.timestamp)) {
            total += 1;
            *daily.entry(event.timestamp.date_naive()).or_default() += 1;
            if let Some(user) = event.user_id.as_deref() {
                attributed += 1;
                *users.entry(user).or_default() += 1;
            }
            if let Some(session) = event.session_id.as_deref() {
                sessions.insert(session);
            }
        }

        let daily_volume: Vec<DailyVolume> = daily
            .into_iter()
            .map(|(date, count)| DailyVolume { date, count })
            .collect();

        // Strictly greater keeps the earliest day on ties.
        let busiest_day = daily_volume.iter().fold(None::<&DailyVolume>, |best, day| match best {
            Some(b) if b.count >= day.count => Some(b),
            _ => Some(day),
        });

        debug!(interactions = total, users = users.len(), days, "Computed interaction summary");

        InteractionSummary {
            period_days: days,
            total_interactions: total,
            unique_users: users.len() as u64,
            unique_sessions: sessions.len() as u64,
            avg_interactions_per_user: mean(Decimal::from(attributed), users.len() as u64),
            busiest_day: busiest_day.cloned(),
            daily_volume,
            top_users: rank_counts(users, Some(self.top_n)),
        }
    }

    fn rank_symbols(&self, per_symbol: BTreeMap<&str, Tally>) -> Vec<SymbolPerformance> {
        let mut ranked: Vec<SymbolPerformance> = per_symbol
            .into_iter()
            .map(|(symbol, tally)| SymbolPerformance {
                symbol: symbol.to_string(),
                signals: tally.signals,
                executed: tally.executed,
                wins: tally.wins,
                win_rate: tally.win_rate(),
                avg_confidence: tally.avg_confidence(),
                avg_pnl_pct: tally.avg_pnl(),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.win_rate
                .cmp(&a.win_rate)
                .then_with(|| b.signals.cmp(&a.signals))
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        ranked.truncate(self.top_n);
        ranked
    }
}

/// Running totals for one group of signals.
#[derive(Debug, Default)]
struct Tally {
    signals: u64,
    executed: u64,
    wins: u64,
    expired: u64,
    pending: u64,
    confidence_sum: Decimal,
    confidence_samples: u64,
    pnl_sum: Decimal,
    pnl_samples: u64,
    risk_reward_sum: Decimal,
    risk_reward_samples: u64,
}

impl Tally {
    fn add(&mut self, signal: &SignalOutcome) {
        self.signals += 1;
        if signal.executed {
            self.executed += 1;
            if let Some(pnl) = signal.pnl_pct {
                self.pnl_sum = saturating_add(self.pnl_sum, pnl);
                self.pnl_samples += 1;
            }
        } else if signal.is_resolved() {
            self.expired += 1;
        } else {
            self.pending += 1;
        }
        if signal.is_win() {
            self.wins += 1;
        }
        if let Some(confidence) = signal.confidence {
            self.confidence_sum = saturating_add(self.confidence_sum, confidence);
            self.confidence_samples += 1;
        }
        if let Some(rr) = signal.risk_reward {
            self.risk_reward_sum = saturating_add(self.risk_reward_sum, rr);
            self.risk_reward_samples += 1;
        }
    }

    fn win_rate(&self) -> Decimal {
        percentage(self.wins, self.executed)
    }

    fn avg_confidence(&self) -> Decimal {
        mean(self.confidence_sum, self.confidence_samples)
    }

    fn avg_pnl(&self) -> Decimal {
        mean(self.pnl_sum, self.pnl_samples)
    }

    fn stats(&self) -> SignalStats {
        SignalStats {
            total_signals: self.signals,
            executed_signals: self.executed,
            winning_signals: self.wins,
            losing_signals: self.executed - self.wins,
            expired_signals: self.expired,
            pending_signals: self.pending,
            execution_rate: percentage(self.executed, self.signals),
            win_rate: self.win_rate(),
            avg_confidence: self.avg_confidence(),
            total_pnl_pct: self.pnl_sum,
            avg_pnl_pct: self.avg_pnl(),
            avg_risk_reward: mean(self.risk_reward_sum, self.risk_reward_samples),
        }
    }
}

/// The executed trade with the highest (`Greater`) or lowest (`Less`) P/L.
/// Ties go to the lexicographically smallest signal id.
fn extreme_trade(signals: &[&SignalOutcome], direction: Ordering) -> Option<TradeRecord> {
    signals
        .iter()
        .filter(|s| s.executed)
        .filter_map(|s| s.pnl_pct.map(|pnl| (*s, pnl)))
        .reduce(|best, candidate| {
            match candidate.1.cmp(&best.1) {
                ord if ord == direction => candidate,
                Ordering::Equal if candidate.0.signal_id < best.0.signal_id => candidate,
                _ => best,
            }
        })
        .map(|(signal, pnl_pct)| TradeRecord {
            signal_id: signal.signal_id.clone(),
            symbol: signal.symbol.clone(),
            timeframe: signal.timeframe.clone(),
            confidence: signal.confidence,
            pnl_pct,
            created_at: signal.created_at,
        })
}

/// Sorts counts descending with ties broken by name, keeping at most `limit` entries.
fn rank_counts(counts: HashMap<&str, u64>, limit: Option<usize>) -> Vec<RankedCount> {
    let mut ranked: Vec<RankedCount> = counts
        .into_iter()
        .map(|(name, count)| RankedCount { name: name.to_string(), count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::{NewQueryEvent, NewSignal, QueryCategory, QuerySource, SignalResolution};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn signal(id: &str, symbol: &str, confidence: Option<Decimal>, age_days: i64) -> SignalOutcome {
        NewSignal {
            signal_id: id.to_string(),
            symbol: symbol.to_string(),
            timeframe: "1h".to_string(),
            confidence,
            risk_reward: Some(dec!(2)),
            created_at: now() - Duration::days(age_days),
        }
        .validate()
        .unwrap()
        .into_outcome()
    }

    fn executed(mut outcome: SignalOutcome, won: bool, pnl_pct: Decimal) -> SignalOutcome {
        let resolved_at = outcome.created_at + Duration::hours(4);
        outcome
            .resolve(&SignalResolution::Executed { won, pnl_pct, resolved_at })
            .unwrap();
        outcome
    }

    fn expired(mut outcome: SignalOutcome) -> SignalOutcome {
        let resolved_at = outcome.created_at + Duration::hours(4);
        outcome.resolve(&SignalResolution::Expired { resolved_at }).unwrap();
        outcome
    }

    /// 10 BTCUSDT signals: 7 executed with P/L [3, -1, 2, 4, -2, 1, 0.5], 5 of them wins.
    fn btc_history() -> Vec<SignalOutcome> {
        let results = [
            (true, dec!(3)),
            (false, dec!(-1)),
            (true, dec!(2)),
            (true, dec!(4)),
            (false, dec!(-2)),
            (true, dec!(1)),
            (true, dec!(0.5)),
        ];
        let mut signals: Vec<SignalOutcome> = results
            .iter()
            .enumerate()
            .map(|(i, (won, pnl))| {
                executed(signal(&format!("sig-{i}"), "BTCUSDT", Some(dec!(85)), 1), *won, *pnl)
            })
            .collect();
        signals.push(expired(signal("sig-7", "BTCUSDT", Some(dec!(75)), 1)));
        signals.push(signal("sig-8", "BTCUSDT", Some(dec!(95)), 1));
        signals.push(signal("sig-9", "BTCUSDT", None, 1));
        signals
    }

    fn query(source: QuerySource, endpoint: &str, age_hours: i64) -> QueryEvent {
        let mut event = NewQueryEvent::new("price of BTC?", source, endpoint);
        event.timestamp = now() - Duration::hours(age_hours);
        event.duration_ms = 100;
        event.category = QueryCategory::Signal;
        event.validate().unwrap().into_event(age_hours)
    }

    #[test]
    fn signal_summary_rates_and_pnl() {
        let engine = AnalyticsEngine::new();
        let summary = engine.signal_summary(&btc_history(), 30, Some("btcusdt"), now());

        assert_eq!(summary.symbol.as_deref(), Some("BTCUSDT"));
        let stats = &summary.summary;
        assert_eq!(stats.total_signals, 10);
        assert_eq!(stats.executed_signals, 7);
        assert_eq!(stats.winning_signals, 5);
        assert_eq!(stats.losing_signals, 2);
        assert_eq!(stats.expired_signals, 1);
        assert_eq!(stats.pending_signals, 2);
        assert_eq!(stats.execution_rate, dec!(70.00));
        assert_eq!(stats.win_rate, dec!(71.43));
        assert_eq!(stats.total_pnl_pct, dec!(7.5));
        assert_eq!(stats.avg_pnl_pct, dec!(1.07));
        assert_eq!(stats.avg_risk_reward, dec!(2));

        assert_eq!(summary.best_trade.as_ref().unwrap().pnl_pct, dec!(4));
        assert_eq!(summary.best_trade.unwrap().signal_id, "sig-3");
        assert_eq!(summary.worst_trade.unwrap().signal_id, "sig-4");
    }

    #[test]
    fn confidence_buckets_cover_every_scored_signal() {
        let engine = AnalyticsEngine::new();
        let summary = engine.signal_summary(&btc_history(), 30, None, now());

        let bucketed: u64 = summary.confidence_distribution.iter().map(|b| b.count).sum();
        assert_eq!(bucketed, 9);

        let bands: Vec<ConfidenceBucket> =
            summary.confidence_distribution.iter().map(|b| b.bucket).collect();
        assert_eq!(
            bands,
            vec![ConfidenceBucket::UltraHigh, ConfidenceBucket::High, ConfidenceBucket::Medium]
        );

        let high = &summary.confidence_distribution[1];
        assert_eq!((high.count, high.executed, high.wins), (7, 7, 5));
        assert_eq!(high.win_rate, dec!(71.43));
    }

    #[test]
    fn window_excludes_older_signals() {
        let engine = AnalyticsEngine::new();
        let mut signals = btc_history();
        signals.push(executed(signal("old", "ETHUSDT", Some(dec!(99)), 45), true, dec!(10)));

        let summary = engine.signal_summary(&signals, 30, None, now());
        assert_eq!(summary.summary.total_signals, 10);
        assert!(summary.top_symbols.iter().all(|s| s.symbol == "BTCUSDT"));

        let wider = engine.signal_summary(&signals, 60, None, now());
        assert_eq!(wider.summary.total_signals, 11);
        assert_eq!(wider.best_trade.unwrap().signal_id, "old");
    }

    #[test]
    fn empty_input_yields_zeroed_summary() {
        let engine = AnalyticsEngine::new();
        let summary = engine.signal_summary(&[], 30, None, now());

        assert_eq!(summary.summary, SignalStats::default());
        assert!(summary.best_trade.is_none());
        assert!(summary.worst_trade.is_none());
        assert!(summary.top_symbols.is_empty());
        assert!(summary.confidence_distribution.is_empty());
    }

    #[test]
    fn symbols_rank_by_win_rate_then_volume_then_name() {
        let engine = AnalyticsEngine::new();
        let signals = vec![
            executed(signal("a1", "SOLUSDT", None, 1), true, dec!(1)),
            executed(signal("b1", "ADAUSDT", None, 1), true, dec!(1)),
            executed(signal("c1", "ETHUSDT", None, 1), true, dec!(1)),
            executed(signal("c2", "ETHUSDT", None, 1), true, dec!(1)),
            executed(signal("d1", "XRPUSDT", None, 1), false, dec!(-1)),
        ];

        let summary = engine.signal_summary(&signals, 7, None, now());
        let order: Vec<&str> = summary.top_symbols.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(order, vec!["ETHUSDT", "ADAUSDT", "SOLUSDT", "XRPUSDT"]);
    }

    #[test]
    fn top_symbols_respect_limit() {
        let engine = AnalyticsEngine::with_top_n(2);
        let signals: Vec<SignalOutcome> = ["AAA", "BBB", "CCC"]
            .iter()
            .map(|s| signal(&format!("{s}-1"), s, None, 1))
            .collect();

        let summary = engine.signal_summary(&signals, 7, None, now());
        assert_eq!(summary.top_symbols.len(), 2);
        assert_eq!(summary.summary.total_signals, 3);
    }

    #[test]
    fn extreme_pnl_values_saturate_instead_of_overflowing() {
        // Records that bypassed ingestion bounds, e.g. rows written before they existed.
        let huge = |id: &str, pnl_pct: Decimal| {
            let mut outcome = signal(id, "XRPUSDT", Some(dec!(80)), 1);
            outcome.executed = true;
            outcome.won = Some(pnl_pct.is_sign_positive());
            outcome.pnl_pct = Some(pnl_pct);
            outcome.risk_reward = Some(Decimal::MAX);
            outcome.resolved_at = Some(outcome.created_at);
            outcome
        };
        let signals = vec![
            huge("a", Decimal::MAX),
            huge("b", Decimal::MAX),
            huge("c", Decimal::MAX),
        ];

        let summary = AnalyticsEngine::new().signal_summary(&signals, 30, None, now());
        assert_eq!(summary.summary.executed_signals, 3);
        assert_eq!(summary.summary.total_pnl_pct, Decimal::MAX);
        assert!(summary.summary.avg_pnl_pct > Decimal::ZERO);
        assert!(summary.summary.avg_risk_reward > Decimal::ZERO);
        assert_eq!(summary.top_symbols[0].symbol, "XRPUSDT");

        let losses = vec![huge("d", Decimal::MIN), huge("e", Decimal::MIN)];
        let summary = AnalyticsEngine::new().signal_summary(&losses, 30, None, now());
        assert_eq!(summary.summary.total_pnl_pct, Decimal::MIN);
    }

    #[test]
    fn equal_pnl_ties_go_to_smallest_signal_id() {
        let signals = vec![
            executed(signal("z", "BTCUSDT", None, 1), true, dec!(2)),
            executed(signal("a", "BTCUSDT", None, 1), true, dec!(2)),
        ];
        let summary = AnalyticsEngine::new().signal_summary(&signals, 7, None, now());
        assert_eq!(summary.best_trade.unwrap().signal_id, "a");
        assert_eq!(summary.worst_trade.unwrap().signal_id, "a");
    }

    #[test]
    fn query_summary_counts_and_ranks() {
        let mut events = vec![
            query(QuerySource::MessagingBot, "/api/signals", 1),
            query(QuerySource::MessagingBot, "/api/chart", 2),
            query(QuerySource::ExternalAssistant, "/api/signals", 3),
            query(QuerySource::DirectApi, "/api/signals", 24 * 10),
        ];
        events[1].success = false;
        events[2].cache_hit = true;
        events[2].duration_ms = 400;

        let summary = AnalyticsEngine::new().query_summary(&events, 7, now());

        assert_eq!(summary.total_queries, 3);
        assert_eq!(summary.failed_queries, 1);
        assert_eq!(summary.success_rate, dec!(66.67));
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.cache_hit_rate, dec!(33.33));
        assert_eq!(summary.avg_duration_ms, dec!(200));
        assert_eq!(
            summary.by_source,
            vec![
                RankedCount { name: "messaging_bot".into(), count: 2 },
                RankedCount { name: "external_assistant".into(), count: 1 },
            ]
        );
        assert_eq!(summary.top_endpoints[0], RankedCount { name: "/api/signals".into(), count: 2 });
        assert_eq!(summary.by_category, vec![RankedCount { name: "signal".into(), count: 3 }]);
    }

    #[test]
    fn query_summary_of_nothing_is_zeroed() {
        let summary = AnalyticsEngine::new().query_summary(&[], 7, now());
        assert_eq!(summary.total_queries, 0);
        assert_eq!(summary.success_rate, Decimal::ZERO);
        assert_eq!(summary.avg_duration_ms, Decimal::ZERO);
        assert!(summary.by_source.is_empty());
    }

    #[test]
    fn interaction_summary_groups_users_sessions_and_days() {
        let mut events: Vec<QueryEvent> = (0..5)
            .map(|i| query(QuerySource::MessagingBot, "/api/signals", i * 12))
            .collect();
        events[0].user_id = Some("alice".into());
        events[1].user_id = Some("alice".into());
        events[2].user_id = Some("bob".into());
        events[0].session_id = Some("s1".into());
        events[1].session_id = Some("s1".into());
        events[2].session_id = Some("s2".into());

        let summary = AnalyticsEngine::new().interaction_summary(&events, 7, now());

        assert_eq!(summary.total_interactions, 5);
        assert_eq!(summary.unique_users, 2);
        assert_eq!(summary.unique_sessions, 2);
        assert_eq!(summary.avg_interactions_per_user, dec!(1.5));
        assert_eq!(summary.top_users[0], RankedCount { name: "alice".into(), count: 2 });

        // Offsets 0h,12h on 03-15; 24h,36h on 03-14; 48h on 03-13.
        let days: Vec<(String, u64)> = summary
            .daily_volume
            .iter()
            .map(|d| (d.date.to_string(), d.count))
            .collect();
        assert_eq!(
            days,
            vec![
                ("2026-03-13".to_string(), 1),
                ("2026-03-14".to_string(), 2),
                ("2026-03-15".to_string(), 2),
            ]
        );
        assert_eq!(summary.busiest_day.unwrap().date.to_string(), "2026-03-14");
    }

    #[test]
    fn summaries_serialize_with_report_sections() {
        let summary = AnalyticsEngine::new().signal_summary(&btc_history(), 30, None, now());
        let json = serde_json::to_value(&summary).unwrap();
        for section in ["summary", "best_trade", "worst_trade", "top_symbols", "confidence_distribution"] {
            assert!(json.get(section).is_some(), "missing {section}");
        }
        assert_eq!(json["confidence_distribution"][0]["bucket"], "ULTRA_HIGH");
    }
}
