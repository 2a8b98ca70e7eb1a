//! Step and pipeline result types.

use super::StepPhase;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// The outcome of one step.
///
/// `StepResult` is built once by the step (or by the lifecycle runner on
/// failure) and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Whether the step succeeded.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Open payload for callers and reports.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
    /// Files the step read or wrote.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_processed: Vec<PathBuf>,
    /// Phase that failed, for failed results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<StepPhase>,
}

impl StepResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: HashMap::new(),
            files_processed: Vec::new(),
            failed_phase: None,
        }
    }

    /// Creates a failed result from the step's own execution.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::failed_in(StepPhase::Execution, message)
    }

    /// Creates a failed result attributed to a lifecycle phase.
    #[must_use]
    pub fn failed_in(phase: StepPhase, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: HashMap::new(),
            files_processed: Vec::new(),
            failed_phase: Some(phase),
        }
    }

    /// Adds a single payload entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Sets the processed file list.
    #[must_use]
    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files_processed = files;
        self
    }

    /// Returns a payload value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Returns true if the step failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.success
    }
}

/// A step that a dry run would execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Step number.
    pub step_number: u32,
    /// Step name.
    pub step_name: String,
}

/// The aggregate outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// True only if every attempted step succeeded.
    pub success: bool,
    /// Steps that completed, in execution order.
    pub steps_completed: Vec<u32>,
    /// Result of every attempted step.
    pub results: BTreeMap<u32, StepResult>,
    /// The first failure, prefixed with its step number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Numbers in range with no registered step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_steps: Vec<u32>,
    /// Steps a dry run would execute, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned_steps: Vec<PlannedStep>,
    /// Whether this was a dry run.
    #[serde(default)]
    pub dry_run: bool,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineResult {
    /// Creates an empty, successful result.
    #[must_use]
    pub fn empty(dry_run: bool) -> Self {
        Self {
            success: true,
            steps_completed: Vec::new(),
            results: BTreeMap::new(),
            error_message: None,
            skipped_steps: Vec::new(),
            planned_steps: Vec::new(),
            dry_run,
            duration_ms: 0.0,
        }
    }

    /// Returns the number of the step that stopped the run, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<u32> {
        self.results
            .iter()
            .find(|(_, result)| result.is_failure())
            .map(|(number, _)| *number)
    }

    /// Returns the result of one step.
    #[must_use]
    pub fn step_result(&self, step: u32) -> Option<&StepResult> {
        self.results.get(&step)
    }
}
