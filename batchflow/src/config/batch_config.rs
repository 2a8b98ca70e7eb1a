//! Per-batch configuration: step completion flags and step settings.

use super::{read_json, write_atomically};
use crate::errors::ConfigError;
use crate::utils::timestamps::{iso8601, now_utc, parse_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The persisted per-batch document.
///
/// Step keys are written as `"1"`, `"2"`, ...; `"step1"` and `"step_1"`
/// are also accepted on read. Top-level keys this type does not know are
/// kept and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchConfig {
    /// Display name of the project.
    pub project_name: String,
    /// When the config was first written.
    #[serde(with = "iso8601")]
    pub created: Timestamp,
    /// Step number to completion flag.
    pub steps_completed: BTreeMap<u32, bool>,
    /// Step number to step-specific settings.
    pub step_configurations: BTreeMap<u32, serde_json::Value>,
    /// Keys owned by other tools.
    #[serde(skip)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawBatchConfig {
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    created: Option<String>,
    #[serde(default, alias = "completed_steps")]
    steps_completed: BTreeMap<String, bool>,
    #[serde(default, alias = "step_settings")]
    step_configurations: BTreeMap<String, serde_json::Value>,
}

const KNOWN_KEYS: [&str; 6] = [
    "project_name",
    "created",
    "steps_completed",
    "completed_steps",
    "step_configurations",
    "step_settings",
];

fn parse_step_key(key: &str) -> Option<u32> {
    let trimmed = key.trim();
    let digits = trimmed
        .strip_prefix("step")
        .map_or(trimmed, |rest| rest.trim_start_matches('_'));
    digits.parse().ok()
}

fn keyed_by_step<V>(raw: BTreeMap<String, V>) -> BTreeMap<u32, V> {
    raw.into_iter()
        .filter_map(|(key, value)| match parse_step_key(&key) {
            Some(step) => Some((step, value)),
            None => {
                warn!(key = %key, "Ignoring non-numeric step key in batch config");
                None
            }
        })
        .collect()
}

impl BatchConfig {
    /// Creates a config with every step marked incomplete.
    #[must_use]
    pub fn new(project_name: impl Into<String>, total_steps: u32) -> Self {
        Self {
            project_name: project_name.into(),
            created: now_utc(),
            steps_completed: (1..=total_steps).map(|step| (step, false)).collect(),
            step_configurations: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Decodes a config document.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "batch config must be a JSON object",
            ));
        };

        let mut known = serde_json::Map::new();
        for key in KNOWN_KEYS {
            if let Some(value) = map.remove(key) {
                known.insert(key.to_string(), value);
            }
        }
        let raw: RawBatchConfig = serde_json::from_value(serde_json::Value::Object(known))?;

        let created = raw
            .created
            .as_deref()
            .and_then(|text| parse_timestamp(text).ok())
            .unwrap_or_else(now_utc);

        Ok(Self {
            project_name: raw.project_name,
            created,
            steps_completed: keyed_by_step(raw.steps_completed),
            step_configurations: keyed_by_step(raw.step_configurations),
            extra: map,
        })
    }

    /// Encodes the config, including preserved foreign keys.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(ref mut map) = value {
            for (key, extra) in &self.extra {
                map.entry(key.clone()).or_insert_with(|| extra.clone());
            }
        }
        Ok(value)
    }

    /// Reads a config file.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let value: serde_json::Value = read_json(path)?;
        Self::from_json(value).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns true if the step's completion flag is set.
    #[must_use]
    pub fn is_step_complete(&self, step: u32) -> bool {
        self.steps_completed.get(&step).copied().unwrap_or(false)
    }

    /// Returns completed step numbers in ascending order.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<u32> {
        self.steps_completed
            .iter()
            .filter(|(_, done)| **done)
            .map(|(step, _)| *step)
            .collect()
    }

    /// Counts completed steps within `1..=total_steps`.
    #[must_use]
    pub fn completed_count(&self, total_steps: u32) -> u32 {
        let count = (1..=total_steps)
            .filter(|step| self.is_step_complete(*step))
            .count();
        u32::try_from(count).unwrap_or(total_steps)
    }

    /// Returns the first step in `1..=total_steps` not yet complete.
    #[must_use]
    pub fn first_incomplete(&self, total_steps: u32) -> Option<u32> {
        (1..=total_steps).find(|step| !self.is_step_complete(*step))
    }
}

/// Owns one batch's config file and keeps it in sync with memory.
///
/// Every mutation is written to disk before it becomes visible in memory;
/// if the write fails, memory is left unchanged.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
    total_steps: u32,
    config: BatchConfig,
}

impl ConfigManager {
    /// Writes a fresh config for a new batch.
    pub fn create(
        path: impl Into<PathBuf>,
        project_name: impl Into<String>,
        total_steps: u32,
    ) -> Result<Self, ConfigError> {
        let manager = Self {
            path: path.into(),
            total_steps,
            config: BatchConfig::new(project_name, total_steps),
        };
        manager.save()?;
        debug!(path = %manager.path.display(), "Created batch config");
        Ok(manager)
    }

    /// Loads an existing config file.
    ///
    /// Steps missing from the file are treated as incomplete.
    pub fn load(path: impl Into<PathBuf>, total_steps: u32) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut config = BatchConfig::read(&path)?;
        for step in 1..=total_steps {
            config.steps_completed.entry(step).or_insert(false);
        }
        Ok(Self {
            path,
            total_steps,
            config,
        })
    }

    /// Returns the config file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of steps completion is measured against.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Returns the in-memory document.
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Returns the project name.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.config.project_name
    }

    /// Returns true if the step's completion flag is set.
    #[must_use]
    pub fn is_step_complete(&self, step: u32) -> bool {
        self.config.is_step_complete(step)
    }

    /// Returns completed step numbers in ascending order.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<u32> {
        self.config.completed_steps()
    }

    /// Counts completed steps.
    #[must_use]
    pub fn completed_count(&self) -> u32 {
        self.config.completed_count(self.total_steps)
    }

    /// Returns the first incomplete step, or `None` when all are done.
    #[must_use]
    pub fn next_incomplete_step(&self) -> Option<u32> {
        self.config.first_incomplete(self.total_steps)
    }

    /// Sets a step's completion flag and persists it.
    pub fn mark_step_complete(&mut self, step: u32) -> Result<(), ConfigError> {
        self.check_step(step)?;
        self.update(|config| {
            config.steps_completed.insert(step, true);
        })
    }

    /// Clears a step's completion flag and persists it.
    pub fn reset_step(&mut self, step: u32) -> Result<(), ConfigError> {
        self.check_step(step)?;
        self.update(|config| {
            config.steps_completed.insert(step, false);
        })
    }

    /// Clears the flags of `step` and every later step.
    pub fn reset_steps_from(&mut self, step: u32) -> Result<(), ConfigError> {
        self.check_step(step)?;
        let total_steps = self.total_steps;
        self.update(|config| {
            for later in step..=total_steps {
                config.steps_completed.insert(later, false);
            }
        })
    }

    /// Returns a step's settings.
    #[must_use]
    pub fn step_settings(&self, step: u32) -> Option<&serde_json::Value> {
        self.config.step_configurations.get(&step)
    }

    /// Replaces a step's settings and persists them.
    pub fn set_step_settings(
        &mut self,
        step: u32,
        settings: serde_json::Value,
    ) -> Result<(), ConfigError> {
        self.check_step(step)?;
        self.update(|config| {
            config.step_configurations.insert(step, settings);
        })
    }

    /// Writes the current document to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        Self::write(&self.path, &self.config)
    }

    fn write(path: &Path, config: &BatchConfig) -> Result<(), ConfigError> {
        let value = config.to_json()?;
        let bytes = serde_json::to_vec_pretty(&value)?;
        write_atomically(path, &bytes).map_err(|source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    fn update<F: FnOnce(&mut BatchConfig)>(&mut self, apply: F) -> Result<(), ConfigError> {
        let mut next = self.config.clone();
        apply(&mut next);
        Self::write(&self.path, &next)?;
        self.config = next;
        Ok(())
    }

    fn check_step(&self, step: u32) -> Result<(), ConfigError> {
        if step == 0 || step > self.total_steps {
            return Err(ConfigError::StepOutOfRange {
                step,
                total_steps: self.total_steps,
            });
        }
        Ok(())
    }
}
