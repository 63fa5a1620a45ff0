use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::serial::{BAUD_RATE, PROBE_BAUD_RATE};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Link timing and logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub probe_baud_rate: u32,
    pub connect_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub verification_window_ms: u64,
    pub verification_cache_secs: u64,
    pub poll_interval_ms: u64,
    pub log_level: String,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            probe_baud_rate: PROBE_BAUD_RATE,
            connect_timeout_ms: 2000,
            probe_timeout_ms: 2000,
            read_timeout_ms: 1000,
            verification_window_ms: 3000,
            verification_cache_secs: 60,
            poll_interval_ms: 100,
            log_level: "info".to_string(),
        }
    }
}

impl LinkSettings {
    /// Load from a JSON file; absent fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        log::debug!("Loaded link settings from {}", path.display());
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn verification_window(&self) -> Duration {
        Duration::from_millis(self.verification_window_ms)
    }

    pub fn verification_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.verification_cache_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
