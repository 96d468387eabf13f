use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "RIVERBED_SUPPLY_CONFIG";

const MAX_RETRIES: u32 = 5;

/// Root configuration structure for the supply step.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SupplyConfig {
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Network behaviour for fetching the profiler archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Extra attempts after the first one fails.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Delay before the given retry (1-based), growing linearly.
    pub fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(retry)))
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load config from an explicit file, or built-in defaults when none is given.
///
/// Unlike a missing optional file, an explicitly requested file that cannot be
/// read or parsed is an error.
pub fn load_config(path: Option<&Path>) -> Result<SupplyConfig> {
    let Some(path) = path else {
        return Ok(SupplyConfig::default());
    };

    let content = fs::read_to_string(path)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e.to_string()))?;

    let config: SupplyConfig = serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e.to_string()))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &SupplyConfig) -> Result<()> {
    let download = &config.download;

    if download.timeout_secs == 0 {
        return Err(Error::config_invalid_value(
            "download.timeout_secs",
            Some("0".to_string()),
            "timeout must be at least one second",
        ));
    }

    if download.retries > MAX_RETRIES {
        return Err(Error::config_invalid_value(
            "download.retries",
            Some(download.retries.to_string()),
            format!("at most {} retries are allowed", MAX_RETRIES),
        ));
    }

    Ok(())
}
