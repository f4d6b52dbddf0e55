use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A closed time interval `[start, end]`.
///
/// Analytics windows always end at "now" and reach back a whole number of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The trailing window of `days` days ending at `now`.
    pub fn trailing_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}
