//! Configuration for the backup tracker and dashboard
//!
//! Settings come from, in increasing priority:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. `FORMKEEP_*` environment variables (`FORMKEEP_SYNC__ENDPOINT` for nested keys)

use crate::error::{FormKeepError, Result};
use crate::storage::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
const ENV_PREFIX: &str = "FORMKEEP";

/// Tracker and storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Key under which the entry array is persisted
    pub storage_key: String,

    /// Delay between the last qualifying change and the save (in milliseconds)
    #[serde(with = "serde_duration_millis")]
    pub debounce: Duration,

    /// Interval between flush/purge passes (in seconds)
    #[serde(with = "serde_duration")]
    pub maintenance_interval: Duration,

    /// Entries not updated within this many days are purged
    pub retention_days: u32,

    /// Maximum number of entries kept in local storage
    pub max_entries: usize,

    /// Remote dashboard sync
    pub sync: SyncConfig,
}

/// Remote sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Dashboard endpoint receiving POSTed entries; sync is off when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Minimum time between sync rounds (in seconds)
    #[serde(with = "serde_duration")]
    pub interval: Duration,

    /// Per-request timeout (in seconds)
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            debounce: Duration::from_millis(3000),
            maintenance_interval: Duration::from_secs(10),
            retention_days: 7,
            max_entries: 50,
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
        }
    }
}

// Custom serde module for Duration (serialize/deserialize as seconds)
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod serde_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl TrackerConfig {
    /// Load defaults, then the optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: TrackerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(FormKeepError::Config("storage_key must not be empty".to_string()));
        }

        if self.debounce.is_zero() {
            return Err(FormKeepError::Config("debounce must be greater than zero".to_string()));
        }

        if self.maintenance_interval.is_zero() {
            return Err(FormKeepError::Config(
                "maintenance_interval must be greater than zero".to_string(),
            ));
        }

        if self.retention_days == 0 {
            return Err(FormKeepError::Config("retention_days must be at least 1".to_string()));
        }

        if self.max_entries == 0 {
            return Err(FormKeepError::Config("max_entries must be at least 1".to_string()));
        }

        if self.sync.interval < Duration::from_secs(1) {
            return Err(FormKeepError::Config(
                "sync.interval must be at least 1 second".to_string(),
            ));
        }

        if let Some(endpoint) = &self.sync.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(FormKeepError::Config(format!(
                    "sync.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Retention window as a chrono duration
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| FormKeepError::Config(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}
