use crate::backend::CacheBackend;
use crate::error::CacheError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::time::Duration;

/// The shared cache: a PostgreSQL table every worker reads and writes.
///
/// Expiry is computed with the database clock (`NOW()`), so workers with skewed clocks
/// still agree on what is stale. The table is created by the database crate's migrations.
#[derive(Debug, Clone)]
pub struct PgCache {
    pool: PgPool,
}

impl PgCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheBackend for PgCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let value: Option<Value> = sqlx::query_scalar(
            "SELECT value FROM analytics_cache WHERE cache_key = $1 AND expires_at > NOW()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO analytics_cache (cache_key, value, expires_at)
            VALUES ($1, $2, NOW() + $3::BIGINT * INTERVAL '1 millisecond')
            ON CONFLICT (cache_key) DO UPDATE
            SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM analytics_cache WHERE cache_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM analytics_cache WHERE starts_with(cache_key, $1)")
            .bind(prefix)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM analytics_cache WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
