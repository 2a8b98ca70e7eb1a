//! Pass/fail verdicts for step pre- and post-conditions.

use crate::context::ScratchSpace;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The outcome of a `validate_inputs` or `validate_outputs` check.
///
/// Errors make the verdict invalid. Warnings are informational and never
/// block a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the check passed.
    pub is_valid: bool,
    /// Accumulated error messages.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Accumulated warning messages.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl ValidationResult {
    /// Creates a passing verdict with no messages.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Creates a failing verdict with a single error.
    #[must_use]
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
        }
    }

    /// Records an error and marks the verdict invalid.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Records a warning. Validity is unchanged.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Folds another verdict into this one.
    pub fn merge(&mut self, other: Self) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Adds an error unless `path` is an existing regular file.
    pub fn require_file(&mut self, path: &Path, what: &str) -> &mut Self {
        if !path.is_file() {
            self.add_error(format!("{what} not found: {}", path.display()));
        }
        self
    }

    /// Adds an error unless `path` is an existing directory.
    pub fn require_dir(&mut self, path: &Path, what: &str) -> &mut Self {
        if !path.is_dir() {
            self.add_error(format!("{what} directory not found: {}", path.display()));
        }
        self
    }

    /// Adds an error unless an earlier step left `key` in the scratch space.
    pub fn require_scratch_key(&mut self, scratch: &ScratchSpace, key: &str) -> &mut Self {
        if !scratch.contains_key(key) {
            self.add_error(format!("Missing '{key}' from an earlier step in this run"));
        }
        self
    }

    /// Joins the errors into one line, for messages and logs.
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.errors.join("; ")
    }
}
