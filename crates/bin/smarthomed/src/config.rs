//! Configuration loading: TOML file with environment variable overrides.
//!
//! `smarthome.toml` is read from the working directory when it exists and
//! every missing field falls back to its default. `SMARTHOME_*` variables
//! then override what the file says.

use std::time::Duration;

use serde::Deserialize;

use smarthome_adapter_http_axum::state::EngineConfig;
use smarthome_app::automation_runner::RunnerConfig;
use smarthome_app::scheduler::SchedulerConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Outbound device calls.
    pub dispatcher: DispatcherConfig,
    /// Job scheduler tuning.
    pub scheduler: SchedulerSection,
    /// Automation chain tuning.
    pub automation: AutomationConfig,
}

/// Where the REST API listens.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `0.0.0.0` by default.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection string, `sqlite::memory:` included.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives.
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Upper bound for one device call.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub tick_millis: u64,
    /// Failed attempts after which a delayed task is given up.
    pub retry_threshold: u32,
    pub retry_window_secs: u64,
    /// Overdue delayed tasks found on restore fire this long after startup.
    pub late_grace_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Wait between two polls of a looping edge.
    pub loop_interval_secs: u64,
}

impl Config {
    /// Load configuration from `smarthome.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting values are out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("smarthome.toml")?;
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

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("SMARTHOME_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("SMARTHOME_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("SMARTHOME_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("SMARTHOME_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("SMARTHOME_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(secs) = var("SMARTHOME_DISPATCH_TIMEOUT_SECS").and_then(|val| val.parse().ok())
        {
            self.dispatcher.timeout_secs = secs;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.server.port == 0, "port must be non-zero"),
            (
                self.dispatcher.timeout_secs == 0,
                "dispatcher.timeout_secs must be non-zero",
            ),
            (
                self.scheduler.tick_millis == 0,
                "scheduler.tick_millis must be non-zero",
            ),
            (
                self.scheduler.retry_threshold == 0,
                "scheduler.retry_threshold must be non-zero",
            ),
            (
                self.automation.loop_interval_secs == 0,
                "automation.loop_interval_secs must be non-zero",
            ),
        ];
        match checks.into_iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::Validation(message.to_string())),
            None => Ok(()),
        }
    }

    /// `host:port` for the TCP listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn dispatcher_config(&self) -> smarthome_adapter_dispatch_reqwest::Config {
        smarthome_adapter_dispatch_reqwest::Config {
            timeout: Duration::from_secs(self.dispatcher.timeout_secs),
        }
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            runner: RunnerConfig {
                loop_interval: Duration::from_secs(self.automation.loop_interval_secs),
            },
            scheduler: SchedulerConfig {
                tick: Duration::from_millis(self.scheduler.tick_millis),
                retry_threshold: self.scheduler.retry_threshold,
                retry_window: Duration::from_secs(self.scheduler.retry_window_secs),
                late_grace: Duration::from_secs(self.scheduler.late_grace_secs),
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:smarthome.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "smarthomed=info,smarthome=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_millis: 1000,
            retry_threshold: 5,
            retry_window_secs: 10,
            late_grace_secs: 10,
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            loop_interval_secs: 2,
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
