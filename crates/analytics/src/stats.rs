use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for every rate, mean and score this crate reports.
pub const REPORT_DP: u32 = 2;

/// Rounds half away from zero to `REPORT_DP` places.
pub fn round_report(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(REPORT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole` as a percentage, 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    round_report(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}

/// `a + b`, pinned to `Decimal::MAX` or `Decimal::MIN` instead of overflowing.
pub fn saturating_add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(if b.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

/// Arithmetic mean, 0 when there are no samples.
pub fn mean(sum: Decimal, samples: u64) -> Decimal {
    if samples == 0 {
        return Decimal::ZERO;
    }
    round_report(sum / Decimal::from(samples))
}
