use analytics::{SignalStats, round_report};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const WIN_RATE_WEIGHT: Decimal = dec!(0.5);
pub const EXECUTION_RATE_WEIGHT: Decimal = dec!(0.3);
pub const CONFIDENCE_WEIGHT: Decimal = dec!(0.2);

/// Weights combining a window's signal statistics into one 0-100 performance score.
///
/// The inputs are all percentages, and the weights sum to one, so the score stays on the
/// same 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub win_rate: Decimal,
    pub execution_rate: Decimal,
    pub avg_confidence: Decimal,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            win_rate: WIN_RATE_WEIGHT,
            execution_rate: EXECUTION_RATE_WEIGHT,
            avg_confidence: CONFIDENCE_WEIGHT,
        }
    }
}

impl ScoreWeights {
    pub fn score(&self, stats: &SignalStats) -> Decimal {
        round_report(
            stats.win_rate * self.win_rate
                + stats.execution_rate * self.execution_rate
                + stats.avg_confidence * self.avg_confidence,
        )
    }
}
