use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod telemetry;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AnalyticsSettings, CacheSettings, Config, DatabaseSettings, LoggingSettings, ServerSettings,
    StorageBackend, StoreSettings,
};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the configuration file
/// (if present), applies `VANTAGE__SECTION__KEY` environment overrides, deserializes the result
/// into our strongly-typed `Config` struct and validates it.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Same as [`load_config`], reading from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("VANTAGE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

/// Parses configuration from an in-memory TOML document. No environment overrides apply.
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cache.ttl_secs, 900);
        assert_eq!(config.analytics.default_signal_days, 30);
        assert_eq!(config.analytics.default_query_days, 7);
        assert_eq!(config.store.backend, StorageBackend::Postgres);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [store]
            backend = "memory"
            timeout_ms = 500

            [cache]
            backend = "memory"
            ttl_secs = 60
            timeout_ms = 100
            purge_interval_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.server.socket_addr().unwrap().port(), 8080);
        assert_eq!(config.store.backend, StorageBackend::Memory);
        assert_eq!(config.cache.ttl().as_secs(), 60);
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let err = parse_config(
            r#"
            [analytics]
            default_signal_days = 400
            default_query_days = 7
            max_window_days = 365
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 9090
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn clamp_days_caps_at_maximum() {
        let analytics = AnalyticsSettings::default();
        assert_eq!(analytics.clamp_days(10), 10);
        assert_eq!(analytics.clamp_days(10_000), 365);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = load_config_from(Path::new("definitely-not-here.toml")).unwrap();
        assert_eq!(config.database.max_connections, 10);
    }
}
