//! Core domain model types for batchflow.
//!
//! This module contains the value types passed between steps, the
//! orchestrator, and callers:
//! - Validation verdicts returned by pre- and post-conditions
//! - Step and pipeline results
//! - Batch status and step phase enums

mod result;
mod status;
mod validation;

pub use result::{PipelineResult, PlannedStep, StepResult};
pub use status::{BatchStatus, ParseStatusError, StepPhase};
pub use validation::ValidationResult;
