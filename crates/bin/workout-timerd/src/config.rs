//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `workout-timer.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use workout_timer_adapter_storage_sqlite_sqlx as storage;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Milliseconds a connection waits on a locked database.
    pub busy_timeout_ms: u64,
    /// Drop and recreate the store when no migration path exists.
    pub destructive_fallback: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `workout-timer.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("workout-timer.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides read through `var`. Unparsable values are ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("WORKOUT_TIMER_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(max) = var("WORKOUT_TIMER_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.database.max_connections = max;
        }
        if let Some(enabled) = var("WORKOUT_TIMER_DESTRUCTIVE_FALLBACK").and_then(|v| v.parse().ok())
        {
            self.database.destructive_fallback = enabled;
        }
        if let Some(val) = var("WORKOUT_TIMER_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "max_connections must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Storage adapter configuration derived from the `[database]` section.
    #[must_use]
    pub fn storage(&self) -> storage::Config {
        storage::Config::new(self.database.url.as_str())
            .with_max_connections(self.database.max_connections)
            .with_busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .with_destructive_fallback(self.database.destructive_fallback)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:workout-timer.db".to_string(),
            max_connections: 4,
            busy_timeout_ms: 5_000,
            destructive_fallback: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "workout_timerd=info,workout_timer_app=info,workout_timer_adapter_storage_sqlite_sqlx=info"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
