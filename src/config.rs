//! Configuration for the crisis risk agent.

use crate::core::{EngineConfig, InvalidConfiguration};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Aggregation engine parameters
    pub risk: RiskConfig,

    /// Alert persistence and notification
    pub alerts: AlertConfig,

    /// Path for storing state and transparency logs
    pub data_path: PathBuf,

    /// Default tracing filter (overridden by RUST_LOG)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crisis-risk-agent");

        Self {
            risk: RiskConfig::default(),
            alerts: AlertConfig::with_log_dir(data_dir.join("alerts")),
            data_path: data_dir,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crisis-risk-agent")
            .join("config.json")
    }

    /// Path of the persisted transparency statistics.
    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.alerts.alert_log_dir)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Risk engine parameters as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// How long a score stays in the rolling window
    #[serde(with = "duration_serde")]
    pub window_duration: Duration,

    /// Final risk at or above which an alert fires (0-1)
    pub alert_threshold: f64,

    /// Minimum live samples before an alert may fire
    pub min_samples: usize,

    /// Quiet period after an alert
    #[serde(with = "duration_serde")]
    pub cooldown_duration: Duration,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window_duration: Duration::from_secs(15 * 60),
            alert_threshold: 0.65,
            min_samples: 5,
            cooldown_duration: Duration::from_secs(30 * 60),
        }
    }
}

impl RiskConfig {
    /// Validate into an engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig, InvalidConfiguration> {
        let window = chrono::Duration::from_std(self.window_duration)
            .map_err(|_| InvalidConfiguration::NonPositiveWindow)?;
        let cooldown = chrono::Duration::from_std(self.cooldown_duration)
            .map_err(|_| InvalidConfiguration::NegativeCooldown)?;

        EngineConfig::new(window, self.alert_threshold, self.min_samples, cooldown)
    }
}

/// How a fired alert is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMethod {
    /// Emit a tracing event
    Log,
    /// Append to the alert summary file
    File,
}

/// Alert persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Directory receiving one JSON file per alert
    pub alert_log_dir: PathBuf,

    /// Notification methods applied to every alert
    pub notification_methods: Vec<NotificationMethod>,

    /// How many of the most recent evidence references to attach
    pub max_evidence_refs: usize,
}

impl AlertConfig {
    pub fn with_log_dir(alert_log_dir: PathBuf) -> Self {
        Self {
            alert_log_dir,
            notification_methods: vec![NotificationMethod::Log, NotificationMethod::File],
            max_evidence_refs: 5,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self::with_log_dir(PathBuf::from("alerts"))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
