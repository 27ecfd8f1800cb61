//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads `safelabs.toml` from the working directory, or the file named by
//! `SAFELABS_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::HashSet;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use safelabs_app::automation_engine::EngineSettings;
use safelabs_domain::automation::RuleThresholds;
use safelabs_domain::id::DeviceId;

const DEFAULT_PATH: &str = "safelabs.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Automation engine settings.
    pub automation: AutomationConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Automation engine configuration. Durations are in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutomationConfig {
    pub poll_interval_ms: u64,
    pub start_delay_ms: u64,
    /// Soft timeout applied to every store call made by the engine.
    pub store_timeout_ms: u64,
    pub inactivity_threshold_ms: u64,
    /// Temperature (°C) above which a critical alert is raised.
    pub critical_temperature: f64,
    pub alert_cooldown_ms: u64,
    /// Device ids evaluated on every tick.
    pub devices: Vec<String>,
}

impl Config {
    /// Load configuration from file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SAFELABS_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
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
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("SAFELABS_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("SAFELABS_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("SAFELABS_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("SAFELABS_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("SAFELABS_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("DEFAULT_DEVICE_ID").filter(|v| !v.trim().is_empty()) {
            match self.automation.devices.first_mut() {
                Some(first) => *first = val,
                None => self.automation.devices.push(val),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        self.engine_settings().map(|_| ())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Build the automation engine settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if an interval is zero, the device
    /// list is empty or holds an invalid or duplicate id, or a threshold is
    /// out of range.
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        let automation = &self.automation;
        if automation.poll_interval_ms == 0 {
            return Err(invalid("automation.poll_interval_ms must be non-zero"));
        }
        if automation.store_timeout_ms == 0 {
            return Err(invalid("automation.store_timeout_ms must be non-zero"));
        }
        if !automation.critical_temperature.is_finite() {
            return Err(invalid("automation.critical_temperature must be a finite number"));
        }
        if automation.devices.is_empty() {
            return Err(invalid("automation.devices must list at least one device"));
        }

        let mut seen = HashSet::new();
        let mut devices = Vec::with_capacity(automation.devices.len());
        for raw in &automation.devices {
            let id = DeviceId::new(raw.as_str())
                .map_err(|err| invalid(format!("automation.devices: {err}")))?;
            if !seen.insert(id.clone()) {
                return Err(invalid(format!("automation.devices: duplicate id {id}")));
            }
            devices.push(id);
        }

        Ok(EngineSettings {
            poll_interval: Duration::from_millis(automation.poll_interval_ms),
            start_delay: Duration::from_millis(automation.start_delay_ms),
            store_timeout: Duration::from_millis(automation.store_timeout_ms),
            devices,
            rules: RuleThresholds {
                inactivity_threshold: millis(
                    "automation.inactivity_threshold_ms",
                    automation.inactivity_threshold_ms,
                )?,
                critical_temperature: automation.critical_temperature,
                alert_cooldown: millis("automation.alert_cooldown_ms", automation.alert_cooldown_ms)?,
            },
        })
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

fn millis(field: &str, value: u64) -> Result<TimeDelta, ConfigError> {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .ok_or_else(|| invalid(format!("{field} is out of range")))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:safelabs.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "safelabsd=info,safelabs=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            start_delay_ms: 3_000,
            store_timeout_ms: 5_000,
            inactivity_threshold_ms: 30_000,
            critical_temperature: 30.0,
            alert_cooldown_ms: 300_000,
            devices: ["sensor_node_01", "sensor_node_02", "sensor_node_03"]
                .map(String::from)
                .to_vec(),
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
