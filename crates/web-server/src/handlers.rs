use crate::{AppState, error::AppError};
use analytics::{InteractionSummary, QuerySummary, SignalSummary};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use core_types::{
    NewQueryEvent, NewSignal, QueryEvent, QueryFilter, SignalOutcome, SignalResolution,
    ValidationError,
};
use reporter::ComprehensiveReport;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A JSON body whose parse failures surface as `AppError::Validation`.
pub type JsonBody<T> = WithRejection<Json<T>, AppError>;
/// Query parameters whose parse failures surface as `AppError::Validation`.
pub type Params<T> = WithRejection<Query<T>, AppError>;
type SignalId = WithRejection<Path<String>, AppError>;

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub days: Option<u32>,
    #[serde(default)]
    pub no_cache: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignalParams {
    pub days: Option<u32>,
    pub symbol: Option<String>,
    #[serde(default)]
    pub no_cache: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: i64,
}

fn check_days(days: Option<u32>) -> Result<Option<u32>, ValidationError> {
    match days {
        Some(0) => Err(ValidationError::new("days", "must be at least 1")),
        other => Ok(other),
    }
}

/// # GET /api/health
/// Liveness plus a round-trip to the event store.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let cache = state.reports.cache().backend_name();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "store": "ok", "cache": cache })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed to reach the event store.");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "store": "unavailable", "cache": cache })),
            )
        }
    }
}

/// # POST /api/queries
/// Logs a query/response pair pushed by a collaborator.
pub async fn log_query(
    State(state): State<AppState>,
    WithRejection(Json(event), _): JsonBody<NewQueryEvent>,
) -> Result<(StatusCode, Json<Created>), AppError> {
    let id = state.store.append(event).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// # GET /api/queries?days&source&category&limit
pub async fn recent_queries(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): Params<QueryFilter>,
) -> Result<Json<Vec<QueryEvent>>, AppError> {
    check_days(filter.days)?;
    let events = state.reports.recent_queries(&filter).await?;
    Ok(Json(events))
}

/// # POST /api/signals
pub async fn record_signal(
    State(state): State<AppState>,
    WithRejection(Json(signal), _): JsonBody<NewSignal>,
) -> Result<(StatusCode, Json<SignalOutcome>), AppError> {
    let outcome = state.reports.record_signal(signal).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// # POST /api/signals/:signal_id/resolve
pub async fn resolve_signal(
    State(state): State<AppState>,
    WithRejection(Path(signal_id), _): SignalId,
    WithRejection(Json(resolution), _): JsonBody<SignalResolution>,
) -> Result<Json<SignalOutcome>, AppError> {
    let outcome = state.reports.resolve_signal(&signal_id, resolution).await?;
    Ok(Json(outcome))
}

/// # GET /api/analytics/signals?days=30&symbol&no_cache
pub async fn signal_analytics(
    State(state): State<AppState>,
    WithRejection(Query(params), _): Params<SignalParams>,
) -> Result<Json<SignalSummary>, AppError> {
    let days = check_days(params.days)?;
    let summary = state
        .reports
        .signal_analytics(days, params.symbol.as_deref(), params.no_cache)
        .await?;
    Ok(Json(summary))
}

/// # GET /api/analytics/queries?days=7&no_cache
pub async fn query_analytics(
    State(state): State<AppState>,
    WithRejection(Query(params), _): Params<WindowParams>,
) -> Result<Json<QuerySummary>, AppError> {
    let days = check_days(params.days)?;
    Ok(Json(state.reports.query_analytics(days, params.no_cache).await?))
}

/// # GET /api/analytics/interactions?days=7&no_cache
pub async fn interaction_analytics(
    State(state): State<AppState>,
    WithRejection(Query(params), _): Params<WindowParams>,
) -> Result<Json<InteractionSummary>, AppError> {
    let days = check_days(params.days)?;
    Ok(Json(state.reports.interaction_analytics(days, params.no_cache).await?))
}

/// # GET /api/analytics/report?days=30&no_cache
pub async fn comprehensive_report(
    State(state): State<AppState>,
    WithRejection(Query(params), _): Params<WindowParams>,
) -> Result<Json<ComprehensiveReport>, AppError> {
    let days = check_days(params.days)?;
    Ok(Json(state.reports.comprehensive_report(days, params.no_cache).await?))
}
