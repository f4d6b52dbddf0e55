use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A fixed confidence band. Bands include their lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBucket {
    UltraHigh,
    High,
    Medium,
    Low,
}

/// The authoritative band table: each band and its inclusive lower bound, highest first.
pub const CONFIDENCE_BANDS: [(ConfidenceBucket, u32); 4] = [
    (ConfidenceBucket::UltraHigh, 90),
    (ConfidenceBucket::High, 80),
    (ConfidenceBucket::Medium, 70),
    (ConfidenceBucket::Low, 0),
];

impl ConfidenceBucket {
    /// The band a score in [0, 100] falls into.
    pub fn for_score(score: Decimal) -> Self {
        CONFIDENCE_BANDS
            .iter()
            .find(|(_, min)| score >= Decimal::from(*min))
            .map_or(ConfidenceBucket::Low, |(bucket, _)| *bucket)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBucket::UltraHigh => "ULTRA_HIGH",
            ConfidenceBucket::High => "HIGH",
            ConfidenceBucket::Medium => "MEDIUM",
            ConfidenceBucket::Low => "LOW",
        }
    }

    /// Human-readable score range, e.g. `80-89`.
    pub fn range(&self) -> &'static str {
        match self {
            ConfidenceBucket::UltraHigh => "90-100",
            ConfidenceBucket::High => "80-89",
            ConfidenceBucket::Medium => "70-79",
            ConfidenceBucket::Low => "0-69",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lower_bounds_are_inclusive() {
        assert_eq!(ConfidenceBucket::for_score(dec!(100)), ConfidenceBucket::UltraHigh);
        assert_eq!(ConfidenceBucket::for_score(dec!(90)), ConfidenceBucket::UltraHigh);
        assert_eq!(ConfidenceBucket::for_score(dec!(89.99)), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::for_score(dec!(80)), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::for_score(dec!(70)), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::for_score(dec!(69.9)), ConfidenceBucket::Low);
        assert_eq!(ConfidenceBucket::for_score(dec!(0)), ConfidenceBucket::Low);
    }

    #[test]
    fn serializes_as_band_label() {
        let json = serde_json::to_string(&ConfidenceBucket::UltraHigh).unwrap();
        assert_eq!(json, format!("\"{}\"", ConfidenceBucket::UltraHigh.label()));
    }
}
