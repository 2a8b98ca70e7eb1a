//! Configuration for batchflow.
//!
//! Two documents live here:
//! - [`Settings`]: process-wide options (step count, registry location, log
//!   format), read from an optional JSON file and environment overrides
//! - [`BatchConfig`]: the per-batch record of which steps are complete plus
//!   step-specific settings, managed through [`ConfigManager`]

mod batch_config;
mod settings;

pub use batch_config::{BatchConfig, ConfigManager};
pub use settings::{LogFormat, Settings, DEFAULT_TOTAL_STEPS};

use crate::errors::ConfigError;
use std::path::Path;

/// Writes `bytes` to a sibling temp file and renames it over `path`.
///
/// Parent directories are created as needed.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)
}

/// Reads and parses a JSON document.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
