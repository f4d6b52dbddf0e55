use crate::error::DbError;
use crate::store::EventStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{
    Metadata, NewQueryEvent, NewSignal, QueryEvent, QueryFilter, SignalOutcome, SignalResolution,
    TimeWindow,
};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, QueryBuilder};

const EVENT_COLUMNS: &str = "id, created_at, query, response, source, endpoint, method, duration_ms, \
     status_code, category, confidence, user_id, session_id, metadata, success, cache_hit";

const SIGNAL_COLUMNS: &str = "signal_id, symbol, timeframe, confidence, executed, won, pnl_pct, \
     risk_reward, created_at, resolved_at";

/// The `PgEventStore` provides the durable, PostgreSQL-backed event log. It encapsulates
/// all SQL queries and data access logic for query events and signal outcomes.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

// This struct represents a row fetched from the query_events table.
#[derive(FromRow, Debug, Clone)]
struct QueryEventRow {
    id: i64,
    created_at: DateTime<Utc>,
    query: String,
    response: String,
    source: String,
    endpoint: String,
    method: String,
    duration_ms: i64,
    status_code: i32,
    category: String,
    confidence: Option<Decimal>,
    user_id: Option<String>,
    session_id: Option<String>,
    metadata: JsonValue,
    success: bool,
    cache_hit: bool,
}

impl TryFrom<QueryEventRow> for QueryEvent {
    type Error = DbError;

    fn try_from(row: QueryEventRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: core_types::ValidationError| DbError::CorruptRow(format!("query_events.id={id}: {e}"));
        Ok(QueryEvent {
            id,
            timestamp: row.created_at,
            source: row.source.parse().map_err(corrupt)?,
            category: row.category.parse().map_err(corrupt)?,
            metadata: Metadata::from_json(row.metadata).map_err(corrupt)?,
            status_code: u16::try_from(row.status_code)
                .map_err(|e| DbError::CorruptRow(format!("query_events.id={id}: {e}")))?,
            query: row.query,
            response: row.response,
            endpoint: row.endpoint,
            method: row.method,
            duration_ms: row.duration_ms,
            confidence: row.confidence,
            user_id: row.user_id,
            session_id: row.session_id,
            success: row.success,
            cache_hit: row.cache_hit,
        })
    }
}

// Signal rows map one-to-one onto the domain struct.
#[derive(FromRow, Debug, Clone)]
struct SignalRow {
    signal_id: String,
    symbol: String,
    timeframe: String,
    confidence: Option<Decimal>,
    executed: bool,
    won: Option<bool>,
    pnl_pct: Option<Decimal>,
    risk_reward: Option<Decimal>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl From<SignalRow> for SignalOutcome {
    fn from(row: SignalRow) -> Self {
        SignalOutcome {
            signal_id: row.signal_id,
            symbol: row.symbol,
            timeframe: row.timeframe,
            confidence: row.confidence,
            executed: row.executed,
            won: row.won,
            pnl_pct: row.pnl_pct,
            risk_reward: row.risk_reward,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        }
    }
}

impl PgEventStore {
    /// Creates a new `PgEventStore` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    /// Inserts the event and returns its id. The insert is committed before the id is
    /// returned, so an acknowledged append is durable.
    async fn append(&self, event: NewQueryEvent) -> Result<i64, DbError> {
        let event = event.validate()?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO query_events (
                created_at, query, response, source, endpoint, method, duration_ms,
                status_code, category, confidence, user_id, session_id, metadata, success, cache_hit
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(event.timestamp)
        .bind(&event.query)
        .bind(&event.response)
        .bind(event.source.as_str())
        .bind(&event.endpoint)
        .bind(&event.method)
        .bind(event.duration_ms)
        .bind(i32::from(event.status_code))
        .bind(event.category.as_str())
        .bind(event.confidence)
        .bind(&event.user_id)
        .bind(&event.session_id)
        .bind(event.metadata.to_json())
        .bind(event.success)
        .bind(event.cache_hit)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id, endpoint = %event.endpoint, source = %event.source, "Query event appended.");
        Ok(id)
    }

    async fn query(&self, filter: &QueryFilter) -> Result<Vec<QueryEvent>, DbError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM query_events WHERE TRUE"));

        if let Some(window) = filter.window(Utc::now()) {
            builder
                .push(" AND created_at >= ")
                .push_bind(window.start)
                .push(" AND created_at <= ")
                .push_bind(window.end);
        }
        if let Some(source) = filter.source {
            builder.push(" AND source = ").push_bind(source.as_str());
        }
        if let Some(category) = filter.category {
            builder.push(" AND category = ").push_bind(category.as_str());
        }
        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.effective_limit() as i64);

        let rows = builder
            .build_query_as::<QueryEventRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(QueryEvent::try_from).collect()
    }

    async fn events_between(&self, window: TimeWindow) -> Result<Vec<QueryEvent>, DbError> {
        let rows = sqlx::query_as::<_, QueryEventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM query_events WHERE created_at >= $1 AND created_at <= $2"
        ))
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QueryEvent::try_from).collect()
    }

    async fn record_signal(&self, signal: NewSignal) -> Result<SignalOutcome, DbError> {
        let outcome = signal.validate()?.into_outcome();
        let inserted = sqlx::query(
            r#"
            INSERT INTO signal_outcomes (signal_id, symbol, timeframe, confidence, risk_reward, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (signal_id) DO NOTHING
            "#,
        )
        .bind(&outcome.signal_id)
        .bind(&outcome.symbol)
        .bind(&outcome.timeframe)
        .bind(outcome.confidence)
        .bind(outcome.risk_reward)
        .bind(outcome.created_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DbError::Duplicate(outcome.signal_id));
        }
        Ok(outcome)
    }

    async fn resolve_signal(
        &self,
        signal_id: &str,
        resolution: SignalResolution,
    ) -> Result<SignalOutcome, DbError> {
        let mut outcome = self.get_signal(signal_id).await?;
        if outcome.is_resolved() {
            return Err(DbError::AlreadyResolved(signal_id.to_string()));
        }
        outcome.resolve(&resolution)?;

        // The `resolved_at IS NULL` guard makes the write itself the once-only check, so two
        // concurrent resolutions cannot both succeed.
        let row = sqlx::query_as::<_, SignalRow>(&format!(
            r#"
            UPDATE signal_outcomes
            SET executed = $2, won = $3, pnl_pct = $4, resolved_at = $5
            WHERE signal_id = $1 AND resolved_at IS NULL
            RETURNING {SIGNAL_COLUMNS}
            "#
        ))
        .bind(signal_id)
        .bind(outcome.executed)
        .bind(outcome.won)
        .bind(outcome.pnl_pct)
        .bind(outcome.resolved_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SignalOutcome::from)
            .ok_or_else(|| DbError::AlreadyResolved(signal_id.to_string()))
    }

    async fn get_signal(&self, signal_id: &str) -> Result<SignalOutcome, DbError> {
        let row = sqlx::query_as::<_, SignalRow>(&format!(
            "SELECT {SIGNAL_COLUMNS} FROM signal_outcomes WHERE signal_id = $1"
        ))
        .bind(signal_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SignalOutcome::from)
            .ok_or_else(|| DbError::NotFound(signal_id.to_string()))
    }

    async fn signals_between(
        &self,
        window: TimeWindow,
        symbol: Option<&str>,
    ) -> Result<Vec<SignalOutcome>, DbError> {
        let symbol = symbol.map(str::to_ascii_uppercase);
        let rows = sqlx::query_as::<_, SignalRow>(&format!(
            r#"
            SELECT {SIGNAL_COLUMNS} FROM signal_outcomes
            WHERE created_at >= $1 AND created_at <= $2 AND ($3::TEXT IS NULL OR symbol = $3)
            "#
        ))
        .bind(window.start)
        .bind(window.end)
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SignalOutcome::from).collect())
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// These run against a throwaway database that `sqlx::test` creates per test from
// `DATABASE_URL`: `cargo test -p database -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, DurationRound, TimeZone};
    use core_types::{QueryCategory, QuerySource};
    use rust_decimal_macros::dec;

    fn event_at(
        timestamp: DateTime<Utc>,
        source: QuerySource,
        category: QueryCategory,
    ) -> NewQueryEvent {
        let mut event = NewQueryEvent::new("what is the trend?", source, "/api/ask");
        event.timestamp = timestamp;
        event.category = category;
        event
    }

    fn minutes_ago(minutes: i64) -> DateTime<Utc> {
        // Postgres keeps microseconds; trimming keeps comparisons exact.
        (Utc::now() - Duration::minutes(minutes))
            .duration_trunc(Duration::seconds(1))
            .unwrap()
    }

    fn signal(id: &str, symbol: &str) -> NewSignal {
        NewSignal {
            signal_id: id.into(),
            symbol: symbol.into(),
            timeframe: "4h".into(),
            confidence: Some(dec!(82)),
            risk_reward: Some(dec!(2)),
            created_at: minutes_ago(60),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn query_orders_newest_first_and_honours_limit(pool: PgPool) {
        let store = PgEventStore::new(pool);
        for minutes in [5, 1, 9, 3, 7, 2, 8, 4, 6, 0] {
            store
                .append(event_at(minutes_ago(minutes), QuerySource::MessagingBot, QueryCategory::Signal))
                .await
                .unwrap();
        }

        let filter = QueryFilter { limit: Some(4), ..Default::default() };
        let events = store.query(&filter).await.unwrap();
        assert_eq!(events.len(), 4);
        assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert!(events[0].timestamp > Utc::now() - Duration::minutes(1));

        let capped = QueryFilter { limit: Some(500), ..Default::default() };
        assert_eq!(store.query(&capped).await.unwrap().len(), 10);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn equal_timestamps_fall_back_to_descending_id(pool: PgPool) {
        let store = PgEventStore::new(pool);
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let first = store.append(event_at(at, QuerySource::DirectApi, QueryCategory::Other)).await.unwrap();
        let second = store.append(event_at(at, QuerySource::DirectApi, QueryCategory::Other)).await.unwrap();
        assert!(second > first);

        let events = store.query(&QueryFilter::default()).await.unwrap();
        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn filters_and_windows_apply_in_sql(pool: PgPool) {
        let store = PgEventStore::new(pool);
        store.append(event_at(minutes_ago(10), QuerySource::MessagingBot, QueryCategory::Chart)).await.unwrap();
        store.append(event_at(minutes_ago(10), QuerySource::ExternalAssistant, QueryCategory::Chart)).await.unwrap();
        store.append(event_at(minutes_ago(10), QuerySource::MessagingBot, QueryCategory::Signal)).await.unwrap();
        store
            .append(event_at(minutes_ago(60 * 24 * 3), QuerySource::MessagingBot, QueryCategory::Chart))
            .await
            .unwrap();

        let filter = QueryFilter {
            days: Some(1),
            source: Some(QuerySource::MessagingBot),
            category: Some(QueryCategory::Chart),
            limit: None,
        };
        let events = store.query(&filter).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, QuerySource::MessagingBot);
        assert_eq!(events[0].category, QueryCategory::Chart);

        let recent = store.events_between(TimeWindow::trailing_days(1, Utc::now())).await.unwrap();
        assert_eq!(recent.len(), 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn appended_rows_map_back_onto_events(pool: PgPool) {
        let store = PgEventStore::new(pool);
        let mut event = event_at(minutes_ago(1), QuerySource::ExternalAssistant, QueryCategory::Analysis);
        event.confidence = Some(dec!(87.5));
        event.user_id = Some("trader-7".into());
        event.status_code = 503;
        event.success = false;
        event.cache_hit = true;
        event.metadata.insert("model", "gpt").unwrap();
        event.metadata.insert("tokens", 512_i64).unwrap();
        let id = store.append(event).await.unwrap();

        let stored = store.query(&QueryFilter::default()).await.unwrap().remove(0);
        assert_eq!(stored.id, id);
        assert_eq!(stored.source, QuerySource::ExternalAssistant);
        assert_eq!(stored.category, QueryCategory::Analysis);
        assert_eq!(stored.confidence, Some(dec!(87.5)));
        assert_eq!(stored.user_id.as_deref(), Some("trader-7"));
        assert_eq!(stored.status_code, 503);
        assert!(!stored.success);
        assert!(stored.cache_hit);
        assert_eq!(stored.metadata.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn malformed_event_is_rejected_before_the_insert(pool: PgPool) {
        let store = PgEventStore::new(pool);
        let mut event = event_at(minutes_ago(0), QuerySource::DirectApi, QueryCategory::Other);
        event.duration_ms = -5;
        assert!(matches!(store.append(event).await.unwrap_err(), DbError::Validation(_)));
        assert!(store.query(&QueryFilter::default()).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn signal_resolves_exactly_once(pool: PgPool) {
        let store = PgEventStore::new(pool);
        store.record_signal(signal("sig-1", "ethusdt")).await.unwrap();

        let resolved = store
            .resolve_signal(
                "sig-1",
                SignalResolution::Executed { won: true, pnl_pct: dec!(2.4), resolved_at: Utc::now() },
            )
            .await
            .unwrap();
        assert!(resolved.is_win());
        assert_eq!(resolved.symbol, "ETHUSDT");
        assert_eq!(resolved.pnl_pct, Some(dec!(2.4)));

        let err = store
            .resolve_signal("sig-1", SignalResolution::Expired { resolved_at: Utc::now() })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::AlreadyResolved(_)));
        let stored = store.get_signal("sig-1").await.unwrap();
        assert!(stored.executed);
        assert_eq!(stored.won, Some(true));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_resolutions_let_only_one_through(pool: PgPool) {
        let store = PgEventStore::new(pool);
        store.record_signal(signal("race", "BTCUSDT")).await.unwrap();

        let resolve = |won| {
            let store = store.clone();
            async move {
                store
                    .resolve_signal(
                        "race",
                        SignalResolution::Executed { won, pnl_pct: dec!(1), resolved_at: Utc::now() },
                    )
                    .await
            }
        };
        let (a, b) = tokio::join!(resolve(true), resolve(false));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser.unwrap_err(), DbError::AlreadyResolved(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn unknown_and_duplicate_signals_are_rejected(pool: PgPool) {
        let store = PgEventStore::new(pool);
        let err = store
            .resolve_signal("nope", SignalResolution::Expired { resolved_at: Utc::now() })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));

        store.record_signal(signal("sig-2", "BTCUSDT")).await.unwrap();
        let err = store.record_signal(signal("sig-2", "BTCUSDT")).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn signals_between_filters_by_symbol(pool: PgPool) {
        let store = PgEventStore::new(pool);
        store.record_signal(signal("a", "BTCUSDT")).await.unwrap();
        store.record_signal(signal("b", "ETHUSDT")).await.unwrap();
        let mut old = signal("c", "BTCUSDT");
        old.created_at = minutes_ago(60 * 24 * 10);
        store.record_signal(old).await.unwrap();
        let window = TimeWindow::trailing_days(1, Utc::now());

        assert_eq!(store.signals_between(window, None).await.unwrap().len(), 2);
        let btc = store.signals_between(window, Some("btcusdt")).await.unwrap();
        assert_eq!(btc.len(), 1);
        assert_eq!(btc[0].signal_id, "a");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn ping_reaches_the_database(pool: PgPool) {
        assert!(PgEventStore::new(pool).ping().await.is_ok());
    }
}
