//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `farmhub.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use farmhub_adapter_mqtt::MqttConfig;
use serde::Deserialize;

/// Upper bound of `storage.recency_window_hours` (one year).
const MAX_RECENCY_WINDOW_HOURS: u32 = 24 * 366;
/// Upper bound of `storage.retention_days` (one hundred years).
const MAX_RETENTION_DAYS: u32 = 366 * 100;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection and topic namespace.
    pub mqtt: MqttConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Control loop tunables.
    pub evaluator: EvaluatorConfig,
    /// Telemetry store settings.
    pub storage: StorageConfig,
    /// Where rule notifications go.
    pub notifications: NotificationsConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Seconds between two evaluation ticks.
    pub interval_secs: u64,
    pub query_timeout_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub max_parallel_farms: usize,
}

/// Backend holding the telemetry readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub readings: ReadingBackend,
    /// How far back "latest value" queries look.
    pub recency_window_hours: u32,
    /// Readings older than this are purged. `0` keeps everything.
    pub retention_days: u32,
}

/// Delivery path of rule notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSinkKind {
    InProcess,
    Mqtt,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub sink: NotificationSinkKind,
    /// Buffered events per user channel of the in-process bus.
    pub bus_capacity: usize,
}

impl Config {
    /// Load configuration from `farmhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("farmhub.toml")?;
        config.apply_env_overrides();
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

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FARMHUB_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("FARMHUB_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("FARMHUB_NAMESPACE") {
            self.mqtt.namespace = val;
        }
        if let Ok(val) = std::env::var("FARMHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("FARMHUB_EVAL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.evaluator.interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("FARMHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        if self.mqtt.broker_port == 0 {
            return invalid("mqtt.broker_port must be non-zero");
        }
        if self.mqtt.namespace.is_empty() || self.mqtt.namespace.contains('/') {
            return invalid("mqtt.namespace must be a single non-empty topic segment");
        }
        if self.mqtt.keep_alive_secs < 5 {
            return invalid("mqtt.keep_alive_secs must be at least 5");
        }
        if self.mqtt.channel_capacity == 0 {
            return invalid("mqtt.channel_capacity must be non-zero");
        }
        if self.evaluator.interval_secs == 0 {
            return invalid("evaluator.interval_secs must be non-zero");
        }
        if self.evaluator.query_timeout_secs == 0 || self.evaluator.dispatch_timeout_secs == 0 {
            return invalid("evaluator timeouts must be non-zero");
        }
        if self.evaluator.max_parallel_farms == 0 {
            return invalid("evaluator.max_parallel_farms must be non-zero");
        }
        if self.storage.recency_window_hours == 0
            || self.storage.recency_window_hours > MAX_RECENCY_WINDOW_HOURS
        {
            return invalid("storage.recency_window_hours must be between 1 and 8784");
        }
        if self.storage.retention_days > MAX_RETENTION_DAYS {
            return invalid("storage.retention_days must be at most 36600");
        }
        if self.notifications.bus_capacity == 0 {
            return invalid("notifications.bus_capacity must be non-zero");
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluator.interval_secs)
    }

    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluator.query_timeout_secs)
    }

    #[must_use]
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluator.dispatch_timeout_secs)
    }

    #[must_use]
    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.storage.recency_window_hours))
    }

    /// Retention of stored readings, `None` when purging is disabled.
    #[must_use]
    pub fn retention(&self) -> Option<chrono::Duration> {
        let days = i64::from(self.storage.retention_days);
        (days > 0).then(|| chrono::Duration::days(days))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:farmhub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "farmhubd=info,farmhub=info".to_string(),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            query_timeout_secs: 5,
            dispatch_timeout_secs: 5,
            max_parallel_farms: 4,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            readings: ReadingBackend::Sqlite,
            recency_window_hours: 24,
            retention_days: 30,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            sink: NotificationSinkKind::InProcess,
            bus_capacity: 64,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.mqtt.broker_host, "localhost");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.mqtt.namespace, "smartfarm");
        assert_eq!(config.database.url, "sqlite:farmhub.db?mode=rwc");
        assert_eq!(config.evaluator.interval_secs, 30);
        assert_eq!(config.storage.readings, ReadingBackend::Sqlite);
        assert_eq!(config.notifications.sink, NotificationSinkKind::InProcess);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.evaluator.interval_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [mqtt]
            broker_host = 'broker.local'
            broker_port = 8883
            client_id = 'edge'
            namespace = 'fx'
            keep_alive_secs = 10
            channel_capacity = 16

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [evaluator]
            interval_secs = 10
            query_timeout_secs = 2
            dispatch_timeout_secs = 3
            max_parallel_farms = 8

            [storage]
            readings = 'memory'
            recency_window_hours = 6
            retention_days = 0

            [notifications]
            sink = 'mqtt'
            bus_capacity = 8
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.mqtt.broker_host, "broker.local");
        assert_eq!(config.mqtt.namespace, "fx");
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.evaluation_interval(), Duration::from_secs(10));
        assert_eq!(config.query_timeout(), Duration::from_secs(2));
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(3));
        assert_eq!(config.evaluator.max_parallel_farms, 8);
        assert_eq!(config.storage.readings, ReadingBackend::Memory);
        assert_eq!(config.recency_window(), chrono::Duration::hours(6));
        assert!(config.retention().is_none());
        assert_eq!(config.notifications.sink, NotificationSinkKind::Mqtt);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [evaluator]
            interval_secs = 60
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.evaluator.interval_secs, 60);
        assert_eq!(config.evaluator.query_timeout_secs, 5);
        assert_eq!(config.mqtt.namespace, "smartfarm");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.mqtt.broker_port, 1883);
    }

    #[test]
    fn should_reject_unknown_backend() {
        let result: Result<Config, _> = toml::from_str("[storage]\nreadings = 'redis'");
        assert!(result.is_err());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_zero_interval() {
        let mut config = Config::default();
        config.evaluator.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_timeouts() {
        let mut config = Config::default();
        config.evaluator.dispatch_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_parallelism() {
        let mut config = Config::default();
        config.evaluator.max_parallel_farms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.mqtt.broker_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_namespace_with_separator() {
        let mut config = Config::default();
        config.mqtt.namespace = "a/b".to_string();
        assert!(config.validate().is_err());

        config.mqtt.namespace = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_short_keep_alive() {
        let mut config = Config::default();
        config.mqtt.keep_alive_secs = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_recency_window() {
        let mut config = Config::default();
        config.storage.recency_window_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_oversized_recency_window() {
        let mut config = Config::default();
        config.storage.recency_window_hours = u32::MAX;
        assert!(config.validate().is_err());

        config.storage.recency_window_hours = MAX_RECENCY_WINDOW_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_reject_oversized_retention() {
        let mut config = Config::default();
        config.storage.retention_days = u32::MAX;
        assert!(config.validate().is_err());

        config.storage.retention_days = MAX_RETENTION_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_expose_retention_when_enabled() {
        let config = Config::default();
        assert_eq!(config.retention(), Some(chrono::Duration::days(30)));
    }
}
