//! The step contract and its lifecycle runner.
//!
//! Steps are the numbered units of work in a batch pipeline. Each one
//! checks its preconditions, performs its transformation, and checks what it
//! produced; [`run_step`] composes the three phases and records completion.

mod runner;

pub use runner::run_step;

use crate::context::ProcessingContext;
use crate::core::{StepResult, ValidationResult};
use async_trait::async_trait;
use std::fmt::Debug;

/// A numbered pipeline step.
///
/// Implementations should be as idempotent as they can: a failed run is
/// re-invoked from the same step, so `execute` must either tolerate work it
/// already did or detect partial state itself.
#[async_trait]
pub trait StepProcessor: Send + Sync + Debug {
    /// Returns the step's position in the pipeline (1-based).
    fn step_number(&self) -> u32;

    /// Returns the step's display name.
    fn step_name(&self) -> &str;

    /// Checks preconditions without changing anything.
    ///
    /// Must be safe to call any number of times.
    fn validate_inputs(&self, ctx: &ProcessingContext) -> ValidationResult;

    /// Performs the transformation.
    ///
    /// Returning `Err` (or panicking) is reported as a failed step; the
    /// error never escapes the pipeline.
    async fn execute(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StepResult>;

    /// Checks that the transformation produced what it should have.
    fn validate_outputs(&self, ctx: &ProcessingContext) -> ValidationResult;
}
