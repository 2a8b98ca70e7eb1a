//! Registry entries and derived summaries.

use crate::core::BatchStatus;
use crate::utils::timestamps::{iso8601, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One registered batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Identity; the key of the entry in the registry document.
    #[serde(skip)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Absolute path of the batch's data directory.
    pub data_directory: PathBuf,
    /// Absolute path of the batch's own config file.
    pub config_path: PathBuf,
    /// When the batch was registered.
    #[serde(with = "iso8601")]
    pub created: Timestamp,
    /// When the batch was last opened or registered.
    #[serde(with = "iso8601")]
    pub last_accessed: Timestamp,
    /// Lifecycle status.
    #[serde(default)]
    pub status: BatchStatus,
}

/// A registry entry merged with the batch's progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Identity.
    pub id: String,
    /// The registry entry.
    #[serde(flatten)]
    pub record: BatchRecord,
    /// Steps marked complete in the batch config.
    pub completed_steps: u32,
    /// Steps in the pipeline.
    pub total_steps: u32,
    /// `completed_steps / total_steps * 100`.
    pub completion_percentage: f64,
    /// First incomplete step, if any.
    pub next_step: Option<u32>,
}

impl BatchSummary {
    pub(crate) fn new(
        record: BatchRecord,
        completed_steps: u32,
        total_steps: u32,
        next_step: Option<u32>,
    ) -> Self {
        let completion_percentage = if total_steps == 0 {
            0.0
        } else {
            f64::from(completed_steps) / f64::from(total_steps) * 100.0
        };

        Self {
            id: record.id.clone(),
            record,
            completed_steps,
            total_steps,
            completion_percentage,
            next_step,
        }
    }

    /// Returns true when every step is complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.total_steps > 0 && self.completed_steps >= self.total_steps
    }
}
