use analytics::{QuerySummary, SignalSummary};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A win rate at or above this earns positive reinforcement.
pub const STRONG_WIN_RATE: Decimal = dec!(70);

/// An execution rate below this suggests signals are being ignored.
pub const LOW_EXECUTION_RATE: Decimal = dec!(30);

/// Derives the report's recommendations from its summaries.
///
/// Rules run in a fixed order and read nothing but their inputs, so the same summaries
/// always produce the same list.
pub fn recommend(signals: &SignalSummary, queries: &QuerySummary) -> Vec<String> {
    let mut out = Vec::new();
    let stats = &signals.summary;

    if stats.total_signals == 0 {
        out.push(format!(
            "Not enough signal data in the last {} days to evaluate performance.",
            signals.period_days
        ));
    } else {
        if stats.win_rate >= STRONG_WIN_RATE {
            out.push(format!(
                "Win rate of {}% is strong; keep following the current signal criteria.",
                stats.win_rate.normalize()
            ));
        }
        if stats.execution_rate < LOW_EXECUTION_RATE {
            out.push(format!(
                "Only {}% of signals were executed; review why signals are not being acted on.",
                stats.execution_rate.normalize()
            ));
        }
        if let Some(best) = signals.top_symbols.iter().find(|s| s.executed > 0) {
            out.push(format!(
                "{} is the best performing symbol with a {}% win rate over {} executed signals.",
                best.symbol,
                best.win_rate.normalize(),
                best.executed
            ));
        }
    }

    if queries.total_queries == 0 {
        out.push(format!(
            "No queries were logged in the last {} days; check that clients are reaching the API.",
            queries.period_days
        ));
    }

    out
}
