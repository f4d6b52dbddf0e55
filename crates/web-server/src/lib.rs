//! # Vantage Web Server
//!
//! The HTTP surface of the query log: ingestion endpoints for collaborators, the analytics
//! read endpoints, and the interceptor that logs every read as a `QueryEvent`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use configuration::Config;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod interceptor;
pub mod state;

pub use error::AppError;
pub use state::AppState;

/// Upper bound on request bodies; query/response texts are capped well below this.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Every route, with reads wrapped by the logging interceptor.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/queries", get(handlers::recent_queries).post(handlers::log_query))
        .route("/api/signals", post(handlers::record_signal))
        .route("/api/signals/:signal_id/resolve", post(handlers::resolve_signal))
        .route("/api/analytics/signals", get(handlers::signal_analytics))
        .route("/api/analytics/queries", get(handlers::query_analytics))
        .route("/api/analytics/interactions", get(handlers::interaction_analytics))
        .route("/api/analytics/report", get(handlers::comprehensive_report))
        .layer(middleware::from_fn_with_state(state.clone(), interceptor::intercept))
        // Added after the interceptor so health probes are not logged.
        .route("/api/health", get(handlers::health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}

/// Builds the application state from `config`, serves until Ctrl+C, then shuts down.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    let state = AppState::build(config).await?;
    let purge = state.spawn_cache_purge(config.cache.purge_interval());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Web server listening.");

    axum::serve(listener, build_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge.abort();
    state.shutdown().await;
    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received.");
}
