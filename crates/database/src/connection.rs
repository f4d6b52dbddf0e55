use crate::error::DbError;
use configuration::DatabaseSettings;
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;

/// Establishes a connection pool to the PostgreSQL database.
///
/// This function reads the `DATABASE_URL` from the environment (loading a `.env` file first
/// when one exists), creates a connection pool sized from the configuration, and returns it.
/// This pool can be shared across the entire application for concurrent database access.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    // A missing .env file is fine; the variable may be set by the process environment.
    dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections = settings.max_connections, "Connected to PostgreSQL.");
    Ok(pool)
}

/// A utility function to run database migrations automatically.
///
/// This ensures the event log, signal and cache tables (and their indexes) exist before the
/// service starts accepting requests.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
