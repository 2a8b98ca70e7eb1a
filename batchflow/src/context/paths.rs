//! Batch directory layout.

use crate::utils::absolutize;
use std::io;
use std::path::{Path, PathBuf};

const CSV_DIR: &str = "csv";
const SOURCE_DIR: &str = "source";
const OUTPUT_DIR: &str = "output";
const LOGS_DIR: &str = "logs";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "project_config.json";

/// Resolves locations inside one batch's data directory.
///
/// ```text
/// <root>/
///   csv/                      spreadsheets
///   source/                   original media
///   output/<name>/            derivatives, one folder per kind
///   logs/
///   config/project_config.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPaths {
    root: PathBuf,
    config_file: PathBuf,
}

impl BatchPaths {
    /// Uses the standard layout under `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = absolutize(root);
        let config_file = root.join(CONFIG_DIR).join(CONFIG_FILE);
        Self { root, config_file }
    }

    /// Uses the standard layout but with a config file kept elsewhere.
    #[must_use]
    pub fn with_config_file(root: impl AsRef<Path>, config_file: impl AsRef<Path>) -> Self {
        Self {
            root: absolutize(root),
            config_file: absolutize(config_file),
        }
    }

    /// Creates the directory tree. Existing directories are left alone.
    pub fn ensure_layout(&self) -> io::Result<()> {
        for dir in [
            self.csv_dir(),
            self.source_dir(),
            self.output_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(parent) = self.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Returns the batch root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the per-batch config file.
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Returns the spreadsheet folder.
    #[must_use]
    pub fn csv_dir(&self) -> PathBuf {
        self.root.join(CSV_DIR)
    }

    /// Returns the original media folder.
    #[must_use]
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_DIR)
    }

    /// Returns the derivatives folder.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Returns the log folder.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// Returns a named derivatives folder, creating it if needed.
    pub fn output_subdir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.output_dir().join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Joins a relative path onto the batch root.
    #[must_use]
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}
