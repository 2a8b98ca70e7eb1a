//! Process-wide settings.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Number of steps in the archival pipeline.
pub const DEFAULT_TOTAL_STEPS: u32 = 8;

const REGISTRY_FILE_NAME: &str = "batch_registry.json";

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(other.to_string()),
        }
    }
}

/// Settings shared by every batch in this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of steps in the pipeline; completion is measured against it.
    #[serde(default = "default_total_steps")]
    pub total_steps: u32,
    /// Location of the batch registry document.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_total_steps() -> u32 {
    DEFAULT_TOTAL_STEPS
}

fn default_registry_path() -> PathBuf {
    dirs::config_dir().map_or_else(
        || PathBuf::from(".batchflow").join(REGISTRY_FILE_NAME),
        |dir| dir.join("batchflow").join(REGISTRY_FILE_NAME),
    )
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            total_steps: default_total_steps(),
            registry_path: default_registry_path(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from an optional JSON file, then applies environment
    /// overrides (`BATCHFLOW_REGISTRY_PATH`, `BATCHFLOW_TOTAL_STEPS`,
    /// `BATCHFLOW_LOG_FORMAT`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => super::read_json(path)?,
            None => Self::default(),
        };
        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a key lookup.
    ///
    /// Split out from [`Settings::load`] so the parsing can be exercised
    /// without touching the process environment.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("BATCHFLOW_REGISTRY_PATH") {
            self.registry_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("BATCHFLOW_TOTAL_STEPS") {
            self.total_steps = raw
                .trim()
                .parse()
                .ok()
                .filter(|steps| *steps > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    key: "BATCHFLOW_TOTAL_STEPS".to_string(),
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup("BATCHFLOW_LOG_FORMAT") {
            self.log_format = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "BATCHFLOW_LOG_FORMAT".to_string(),
                value: raw.clone(),
            })?;
        }
        Ok(self)
    }

    /// Sets the registry path.
    #[must_use]
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Sets the number of steps.
    #[must_use]
    pub fn with_total_steps(mut self, total_steps: u32) -> Self {
        self.total_steps = total_steps;
        self
    }
}
