use comfy_table::{Table, presets::UTF8_FULL};
use reporter::ComprehensiveReport;
use rust_decimal::Decimal;

fn pct(value: Decimal) -> String {
    format!("{}%", value.normalize())
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

/// Headline figures: score, signal rates, P/L and traffic.
pub fn overview(report: &ComprehensiveReport) -> Table {
    let s = &report.signals.summary;
    let q = &report.queries;
    let mut t = table(vec!["Metric", "Value"]);
    t.add_row(vec!["Window".to_string(), format!("{} days", report.period_days)]);
    t.add_row(vec!["Performance score".to_string(), report.performance_score.normalize().to_string()]);
    t.add_row(vec!["Signals".to_string(), s.total_signals.to_string()]);
    t.add_row(vec!["Executed".to_string(), format!("{} ({})", s.executed_signals, pct(s.execution_rate))]);
    t.add_row(vec!["Wins".to_string(), format!("{} ({})", s.winning_signals, pct(s.win_rate))]);
    t.add_row(vec!["Pending".to_string(), s.pending_signals.to_string()]);
    t.add_row(vec!["Avg confidence".to_string(), s.avg_confidence.normalize().to_string()]);
    t.add_row(vec!["Total P/L".to_string(), pct(s.total_pnl_pct)]);
    t.add_row(vec!["Avg risk/reward".to_string(), s.avg_risk_reward.normalize().to_string()]);
    t.add_row(vec!["Queries".to_string(), format!("{} ({} ok)", q.total_queries, pct(q.success_rate))]);
    t.add_row(vec!["Cache hits".to_string(), format!("{} ({})", q.cache_hits, pct(q.cache_hit_rate))]);
    t.add_row(vec!["Users".to_string(), report.interactions.unique_users.to_string()]);
    t
}

pub fn top_symbols(report: &ComprehensiveReport) -> Table {
    let mut t = table(vec!["Symbol", "Signals", "Executed", "Win rate", "Avg P/L"]);
    for s in &report.signals.top_symbols {
        t.add_row(vec![
            s.symbol.clone(),
            s.signals.to_string(),
            s.executed.to_string(),
            pct(s.win_rate),
            pct(s.avg_pnl_pct),
        ]);
    }
    t
}

pub fn confidence_bands(report: &ComprehensiveReport) -> Table {
    let mut t = table(vec!["Band", "Range", "Signals", "Wins", "Win rate"]);
    for b in &report.signals.confidence_distribution {
        t.add_row(vec![
            b.bucket.label().to_string(),
            b.range.clone(),
            b.count.to_string(),
            b.wins.to_string(),
            pct(b.win_rate),
        ]);
    }
    t
}
