//! Batch status and step phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a registered batch.
///
/// Any status may move to any other; the registry does not guard
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Being worked on.
    Active,
    /// Every step done.
    Completed,
    /// Put away; kept for reference.
    Archived,
}

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown batch status '{0}' (expected active, completed or archived)")]
pub struct ParseStatusError(pub String);

impl FromStr for BatchStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

impl BatchStatus {
    /// Returns true for batches still being worked on.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// The phase of the step lifecycle in which a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    /// Preconditions were not met; nothing ran.
    InputValidation,
    /// The transformation reported failure, returned an error, or panicked.
    Execution,
    /// The transformation ran but its artifacts failed the sanity check.
    OutputValidation,
    /// Everything passed but the completion flag could not be persisted.
    CompletionRecord,
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputValidation => write!(f, "input_validation"),
            Self::Execution => write!(f, "execution"),
            Self::OutputValidation => write!(f, "output_validation"),
            Self::CompletionRecord => write!(f, "completion_record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_display() {
        assert_eq!(BatchStatus::Active.to_string(), "active");
        assert_eq!(BatchStatus::Completed.to_string(), "completed");
        assert_eq!(BatchStatus::Archived.to_string(), "archived");
    }

    #[test]
    fn test_batch_status_from_str() {
        assert_eq!("Active".parse::<BatchStatus>(), Ok(BatchStatus::Active));
        assert_eq!(" archived ".parse::<BatchStatus>(), Ok(BatchStatus::Archived));
        assert!("paused".parse::<BatchStatus>().is_err());
    }

    #[test]
    fn test_batch_status_serialize() {
        let json = serde_json::to_string(&BatchStatus::Completed).unwrap();
        assert_eq!(json, r#""completed""#);

        let parsed: BatchStatus = serde_json::from_str(r#""archived""#).unwrap();
        assert_eq!(parsed, BatchStatus::Archived);
    }

    #[test]
    fn test_only_active_is_active() {
        assert!(BatchStatus::Active.is_active());
        assert!(!BatchStatus::Completed.is_active());
        assert!(!BatchStatus::Archived.is_active());
    }

    #[test]
    fn test_step_phase_serialize() {
        let json = serde_json::to_string(&StepPhase::OutputValidation).unwrap();
        assert_eq!(json, r#""output_validation""#);
        assert_eq!(StepPhase::InputValidation.to_string(), "input_validation");
    }
}
