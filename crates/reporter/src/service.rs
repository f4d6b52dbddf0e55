use crate::error::ReportError;
use crate::recommendations::recommend;
use crate::report::ComprehensiveReport;
use crate::scoring::ScoreWeights;
use analytics::{AnalyticsEngine, InteractionSummary, QuerySummary, SignalSummary};
use cache::{CacheKey, CacheLayer};
use chrono::Utc;
use configuration::AnalyticsSettings;
use core_types::{
    NewSignal, QueryEvent, QueryFilter, SignalOutcome, SignalResolution, TimeWindow,
};
use database::SharedStore;
use tracing::{info, instrument};

pub const SIGNALS_NAMESPACE: &str = "signals";
pub const QUERIES_NAMESPACE: &str = "queries";
pub const INTERACTIONS_NAMESPACE: &str = "interactions";
pub const REPORT_NAMESPACE: &str = "report";

/// Reads the event log, aggregates it and memoizes the results.
///
/// The service is constructed once at startup and shared by every handler. Window
/// lengths default from `AnalyticsSettings` and are capped at its maximum.
#[derive(Clone)]
pub struct ReportService {
    store: SharedStore,
    cache: CacheLayer,
    engine: AnalyticsEngine,
    weights: ScoreWeights,
    settings: AnalyticsSettings,
}

impl ReportService {
    pub fn new(store: SharedStore, cache: CacheLayer, settings: AnalyticsSettings) -> Self {
        Self {
            store,
            cache,
            engine: AnalyticsEngine::new(),
            weights: ScoreWeights::default(),
            settings,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    #[instrument(skip(self))]
    pub async fn signal_analytics(
        &self,
        days: Option<u32>,
        symbol: Option<&str>,
        no_cache: bool,
    ) -> Result<SignalSummary, ReportError> {
        let days = self.window_days(days, self.settings.default_signal_days);
        let symbol = symbol
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty());
        let key = CacheKey::builder(SIGNALS_NAMESPACE)
            .param("days", days)
            .optional("symbol", symbol.as_deref())
            .build();

        self.cache
            .get_or_compute(&key, self.cache.default_ttl(), no_cache, || async {
                let now = Utc::now();
                let window = TimeWindow::trailing_days(days, now);
                let signals = self.store.signals_between(window, symbol.as_deref()).await?;
                Ok::<_, ReportError>(self.engine.signal_summary(&signals, days, symbol.as_deref(), now))
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn query_analytics(
        &self,
        days: Option<u32>,
        no_cache: bool,
    ) -> Result<QuerySummary, ReportError> {
        let days = self.window_days(days, self.settings.default_query_days);
        let key = CacheKey::builder(QUERIES_NAMESPACE).param("days", days).build();

        self.cache
            .get_or_compute(&key, self.cache.default_ttl(), no_cache, || async {
                let now = Utc::now();
                let events = self.store.events_between(TimeWindow::trailing_days(days, now)).await?;
                Ok::<_, ReportError>(self.engine.query_summary(&events, days, now))
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn interaction_analytics(
        &self,
        days: Option<u32>,
        no_cache: bool,
    ) -> Result<InteractionSummary, ReportError> {
        let days = self.window_days(days, self.settings.default_query_days);
        let key = CacheKey::builder(INTERACTIONS_NAMESPACE).param("days", days).build();

        self.cache
            .get_or_compute(&key, self.cache.default_ttl(), no_cache, || async {
                let now = Utc::now();
                let events = self.store.events_between(TimeWindow::trailing_days(days, now)).await?;
                Ok::<_, ReportError>(self.engine.interaction_summary(&events, days, now))
            })
            .await
    }

    /// The most recent query events matching `filter`. Never cached.
    pub async fn recent_queries(&self, filter: &QueryFilter) -> Result<Vec<QueryEvent>, ReportError> {
        let mut filter = filter.clone();
        filter.days = filter.days.map(|d| self.settings.clamp_days(d));
        Ok(self.store.query(&filter).await?)
    }

    /// Signal, query and interaction analytics for one window, with a performance score
    /// and recommendations. Any store failure fails the whole report.
    #[instrument(skip(self))]
    pub async fn comprehensive_report(
        &self,
        days: Option<u32>,
        no_cache: bool,
    ) -> Result<ComprehensiveReport, ReportError> {
        let days = self.window_days(days, self.settings.default_signal_days);
        let key = CacheKey::builder(REPORT_NAMESPACE).param("days", days).build();

        self.cache
            .get_or_compute(&key, self.cache.default_ttl(), no_cache, || async {
                let (signals, queries, interactions) = tokio::try_join!(
                    self.signal_analytics(Some(days), None, no_cache),
                    self.query_analytics(Some(days), no_cache),
                    self.interaction_analytics(Some(days), no_cache),
                )?;

                let performance_score = self.weights.score(&signals.summary);
                let recommendations = recommend(&signals, &queries);
                info!(days, %performance_score, "Composed analytics report.");

                Ok::<_, ReportError>(ComprehensiveReport {
                    period_days: days,
                    generated_at: Utc::now(),
                    performance_score,
                    recommendations,
                    signals,
                    queries,
                    interactions,
                })
            })
            .await
    }

    /// Records a newly emitted signal and drops every cached view that counts signals.
    pub async fn record_signal(&self, signal: NewSignal) -> Result<SignalOutcome, ReportError> {
        let outcome = self.store.record_signal(signal).await?;
        self.invalidate_signal_views().await;
        info!(signal_id = %outcome.signal_id, symbol = %outcome.symbol, "Recorded signal.");
        Ok(outcome)
    }

    /// Resolves a signal once and drops every cached view that counts signals.
    pub async fn resolve_signal(
        &self,
        signal_id: &str,
        resolution: SignalResolution,
    ) -> Result<SignalOutcome, ReportError> {
        let outcome = self.store.resolve_signal(signal_id, resolution).await?;
        self.invalidate_signal_views().await;
        info!(
            signal_id = %outcome.signal_id,
            executed = outcome.executed,
            won = ?outcome.won,
            "Resolved signal."
        );
        Ok(outcome)
    }

    async fn invalidate_signal_views(&self) {
        self.cache.invalidate_namespace(SIGNALS_NAMESPACE).await;
        self.cache.invalidate_namespace(REPORT_NAMESPACE).await;
    }

    fn window_days(&self, requested: Option<u32>, default: u32) -> u32 {
        self.settings.clamp_days(requested.unwrap_or(default))
    }
}
