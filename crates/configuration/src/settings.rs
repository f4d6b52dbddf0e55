use crate::error::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an empty `config.toml` (or none at all) yields a
/// runnable development setup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Rejects combinations that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "store.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.cache.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "cache.timeout_ms must be greater than zero".to_string(),
            ));
        }
        let a = &self.analytics;
        if a.max_window_days == 0 {
            return Err(ConfigError::ValidationError(
                "analytics.max_window_days must be at least 1".to_string(),
            ));
        }
        if a.default_signal_days > a.max_window_days || a.default_query_days > a.max_window_days {
            return Err(ConfigError::ValidationError(format!(
                "analytics default windows must not exceed max_window_days ({})",
                a.max_window_days
            )));
        }
        Ok(())
    }
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("invalid server address: {e}")))
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Connection pool settings. The URL itself comes from `DATABASE_URL`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Which implementation backs the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Upper bound on any single store call before it is reported as unavailable.
    pub timeout_ms: u64,
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// The shared cache backend. Falls back to an in-process memo when unreachable.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Time-to-live of cached analytics results.
    pub ttl_secs: u64,
    /// Upper bound on a cache round-trip before the layer degrades to direct computation.
    pub timeout_ms: u64,
    /// How often expired entries are purged by the server.
    pub purge_interval_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            ttl_secs: 15 * 60,
            timeout_ms: 250,
            purge_interval_secs: 300,
        }
    }
}

/// Defaults and bounds for the analytics read endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub default_signal_days: u32,
    pub default_query_days: u32,
    pub max_window_days: u32,
}

impl AnalyticsSettings {
    /// Caps a requested window at the configured maximum.
    pub fn clamp_days(&self, days: u32) -> u32 {
        days.min(self.max_window_days)
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            default_signal_days: 30,
            default_query_days: 7,
            max_window_days: 365,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive, overridden by `RUST_LOG` when set.
    pub level: String,
    /// Directory for the daily rolling log file. No file is written when unset.
    #[serde(default)]
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "vantage.log".to_string(),
        }
    }
}
