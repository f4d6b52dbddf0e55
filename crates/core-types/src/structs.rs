use crate::enums::{QueryCategory, QuerySource};
use crate::error::ValidationError;
use crate::metadata::Metadata;
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum size of the free-text query and response, in bytes.
pub const MAX_TEXT_BYTES: usize = 65_536;
/// Maximum length of an externally assigned signal identifier.
pub const MAX_SIGNAL_ID_LEN: usize = 128;
/// Largest realized P/L magnitude accepted on a resolution, in percent.
pub const MAX_PNL_PCT: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
/// Largest risk/reward ratio accepted on a new signal.
pub const MAX_RISK_REWARD: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

fn default_method() -> String {
    "POST".to_string()
}

fn default_status() -> u16 {
    200
}

fn default_true() -> bool {
    true
}

/// A query/response pair as submitted for logging, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQueryEvent {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub query: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub source: QuerySource,
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Processing time in milliseconds. Signed so that a bad value from a
    /// collaborator is rejected by validation rather than wrapped.
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default = "default_status")]
    pub status_code: u16,
    #[serde(default)]
    pub category: QueryCategory,
    #[serde(default)]
    pub confidence: Option<Decimal>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub cache_hit: bool,
}

impl NewQueryEvent {
    /// A successful, zero-duration event stamped with the current time.
    pub fn new(query: impl Into<String>, source: QuerySource, endpoint: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            query: query.into(),
            response: String::new(),
            source,
            endpoint: endpoint.into(),
            method: default_method(),
            duration_ms: 0,
            status_code: default_status(),
            category: QueryCategory::default(),
            confidence: None,
            user_id: None,
            session_id: None,
            metadata: Metadata::new(),
            success: true,
            cache_hit: false,
        }
    }

    /// Checks every field and returns the normalized event.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::new("query", "must not be empty"));
        }
        if self.query.len() > MAX_TEXT_BYTES {
            return Err(ValidationError::new("query", format!("exceeds {MAX_TEXT_BYTES} bytes")));
        }
        if self.response.len() > MAX_TEXT_BYTES {
            return Err(ValidationError::new("response", format!("exceeds {MAX_TEXT_BYTES} bytes")));
        }
        self.endpoint = self.endpoint.trim().to_string();
        if self.endpoint.is_empty() {
            return Err(ValidationError::new("endpoint", "must not be empty"));
        }
        self.method = self.method.trim().to_ascii_uppercase();
        if self.method.is_empty() {
            return Err(ValidationError::new("method", "must not be empty"));
        }
        if self.duration_ms < 0 {
            return Err(ValidationError::new("duration_ms", "must not be negative"));
        }
        if !(100..=599).contains(&self.status_code) {
            return Err(ValidationError::new("status_code", "must be between 100 and 599"));
        }
        check_confidence(self.confidence)?;
        self.user_id = non_blank(self.user_id);
        self.session_id = non_blank(self.session_id);
        self.metadata.validate()?;
        Ok(self)
    }

    pub fn into_event(self, id: i64) -> QueryEvent {
        QueryEvent {
            id,
            timestamp: self.timestamp,
            query: self.query,
            response: self.response,
            source: self.source,
            endpoint: self.endpoint,
            method: self.method,
            duration_ms: self.duration_ms,
            status_code: self.status_code,
            category: self.category,
            confidence: self.confidence,
            user_id: self.user_id,
            session_id: self.session_id,
            metadata: self.metadata,
            success: self.success,
            cache_hit: self.cache_hit,
        }
    }
}

/// One logged inbound request. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEvent {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub source: QuerySource,
    pub endpoint: String,
    pub method: String,
    pub duration_ms: i64,
    pub status_code: u16,
    pub category: QueryCategory,
    pub confidence: Option<Decimal>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub metadata: Metadata,
    pub success: bool,
    pub cache_hit: bool,
}

/// A trading signal as emitted by the signal generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignal {
    pub signal_id: String,
    pub symbol: String,
    pub timeframe: String,
    #[serde(default)]
    pub confidence: Option<Decimal>,
    #[serde(default)]
    pub risk_reward: Option<Decimal>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl NewSignal {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.signal_id = self.signal_id.trim().to_string();
        if self.signal_id.is_empty() {
            return Err(ValidationError::new("signal_id", "must not be empty"));
        }
        if self.signal_id.len() > MAX_SIGNAL_ID_LEN {
            return Err(ValidationError::new(
                "signal_id",
                format!("exceeds {MAX_SIGNAL_ID_LEN} bytes"),
            ));
        }
        self.symbol = self.symbol.trim().to_ascii_uppercase();
        if self.symbol.is_empty() {
            return Err(ValidationError::new("symbol", "must not be empty"));
        }
        self.timeframe = self.timeframe.trim().to_string();
        if self.timeframe.is_empty() {
            return Err(ValidationError::new("timeframe", "must not be empty"));
        }
        check_confidence(self.confidence)?;
        if let Some(rr) = self.risk_reward {
            if rr.is_sign_negative() {
                return Err(ValidationError::new("risk_reward", "must not be negative"));
            }
            if rr > MAX_RISK_REWARD {
                return Err(ValidationError::new(
                    "risk_reward",
                    format!("must not exceed {MAX_RISK_REWARD}"),
                ));
            }
        }
        Ok(self)
    }

    /// The unresolved outcome record created when the signal is first seen.
    pub fn into_outcome(self) -> SignalOutcome {
        SignalOutcome {
            signal_id: self.signal_id,
            symbol: self.symbol,
            timeframe: self.timeframe,
            confidence: self.confidence,
            executed: false,
            won: None,
            pnl_pct: None,
            risk_reward: self.risk_reward,
            created_at: self.created_at,
            resolved_at: None,
        }
    }
}

/// How a signal's lifecycle ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SignalResolution {
    /// The signal was acted upon and the trade closed.
    Executed {
        won: bool,
        pnl_pct: Decimal,
        #[serde(default = "Utc::now")]
        resolved_at: DateTime<Utc>,
    },
    /// The signal was never acted upon.
    Expired {
        #[serde(default = "Utc::now")]
        resolved_at: DateTime<Utc>,
    },
}

impl SignalResolution {
    pub fn resolved_at(&self) -> DateTime<Utc> {
        match self {
            SignalResolution::Executed { resolved_at, .. } => *resolved_at,
            SignalResolution::Expired { resolved_at } => *resolved_at,
        }
    }
}

/// The full lifecycle record of one signal.
///
/// `won` and `pnl_pct` are only ever set together with `executed = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub signal_id: String,
    pub symbol: String,
    pub timeframe: String,
    pub confidence: Option<Decimal>,
    pub executed: bool,
    pub won: Option<bool>,
    pub pnl_pct: Option<Decimal>,
    pub risk_reward: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SignalOutcome {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Applies a resolution to an unresolved signal. Callers are responsible for
    /// rejecting a second resolution before getting here.
    pub fn resolve(&mut self, resolution: &SignalResolution) -> Result<(), ValidationError> {
        let resolved_at = resolution.resolved_at();
        if resolved_at < self.created_at {
            return Err(ValidationError::new(
                "resolved_at",
                "must not be earlier than the signal's creation time",
            ));
        }
        match resolution {
            SignalResolution::Executed { pnl_pct, .. } if pnl_pct.abs() > MAX_PNL_PCT => {
                return Err(ValidationError::new(
                    "pnl_pct",
                    format!("magnitude must not exceed {MAX_PNL_PCT}"),
                ));
            }
            SignalResolution::Executed { won, pnl_pct, .. } => {
                self.executed = true;
                self.won = Some(*won);
                self.pnl_pct = Some(*pnl_pct);
            }
            SignalResolution::Expired { .. } => {
                self.executed = false;
                self.won = None;
                self.pnl_pct = None;
            }
        }
        self.resolved_at = Some(resolved_at);
        Ok(())
    }

    /// True when the signal was executed and closed in profit.
    pub fn is_win(&self) -> bool {
        self.executed && self.won == Some(true)
    }
}

/// Parameters for reading back recent query events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub days: Option<u32>,
    pub source: Option<QuerySource>,
    pub category: Option<QueryCategory>,
    pub limit: Option<usize>,
}

impl QueryFilter {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 100;

    /// The requested limit, defaulted and clamped to the hard cap.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT)
    }

    pub fn window(&self, now: DateTime<Utc>) -> Option<TimeWindow> {
        self.days.map(|days| TimeWindow::trailing_days(days, now))
    }

    pub fn matches(&self, event: &QueryEvent, now: DateTime<Utc>) -> bool {
        self.window(now).is_none_or(|w| w.contains(event.timestamp))
            && self.source.is_none_or(|s| s == event.source)
            && self.category.is_none_or(|c| c == event.category)
    }
}

fn check_confidence(confidence: Option<Decimal>) -> Result<(), ValidationError> {
    if let Some(c) = confidence {
        if c < Decimal::ZERO || c > Decimal::ONE_HUNDRED {
            return Err(ValidationError::new("confidence", "must be between 0 and 100"));
        }
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
