//! Range orchestrator over numbered steps.

use crate::context::ProcessingContext;
use crate::core::{PipelineResult, PlannedStep};
use crate::errors::PipelineError;
use crate::observability::{pipeline_span, SpanTimer};
use crate::steps::{run_step, StepProcessor};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// Runs numbered steps against one batch.
///
/// Steps are keyed by their number; there is no dependency graph. A run
/// visits `start..=end` in ascending order, skips numbers with no registered
/// step, and stops at the first failed step without rolling back earlier
/// ones. Nothing is retried: re-running the same range resumes at the step
/// that failed, since its completion flag was never set.
#[derive(Debug)]
pub struct Pipeline {
    context: ProcessingContext,
    steps: BTreeMap<u32, Arc<dyn StepProcessor>>,
}

impl Pipeline {
    /// Creates a pipeline with no steps.
    #[must_use]
    pub fn new(context: ProcessingContext) -> Self {
        Self {
            context,
            steps: BTreeMap::new(),
        }
    }

    /// Registers a step under its own number.
    ///
    /// A step registered under a number that is already taken replaces the
    /// earlier one.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::StepOutOfRange` if the step's number is 0 or
    /// greater than the batch's step count.
    pub fn register_step(&mut self, step: Arc<dyn StepProcessor>) -> Result<(), PipelineError> {
        let number = step.step_number();
        let total_steps = self.total_steps();
        if number == 0 || number > total_steps {
            return Err(PipelineError::StepOutOfRange {
                step: number,
                step_name: step.step_name().to_string(),
                total_steps,
            });
        }

        let name = step.step_name().to_string();
        if let Some(previous) = self.steps.insert(number, step) {
            warn!(
                step_number = number,
                previous = %previous.step_name(),
                replacement = %name,
                "Replacing registered step"
            );
        }
        Ok(())
    }

    /// Registers several steps, stopping at the first invalid one.
    pub fn register_steps<I>(&mut self, steps: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = Arc<dyn StepProcessor>>,
    {
        steps.into_iter().try_for_each(|step| self.register_step(step))
    }

    /// Returns the registered steps in execution order.
    #[must_use]
    pub fn registered_steps(&self) -> Vec<PlannedStep> {
        self.steps
            .iter()
            .map(|(number, step)| PlannedStep {
                step_number: *number,
                step_name: step.step_name().to_string(),
            })
            .collect()
    }

    /// Returns true if a step is registered under `number`.
    #[must_use]
    pub fn has_step(&self, number: u32) -> bool {
        self.steps.contains_key(&number)
    }

    /// Returns the batch's step count.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.context.config().total_steps()
    }

    /// Returns the processing context.
    #[must_use]
    pub fn context(&self) -> &ProcessingContext {
        &self.context
    }

    /// Returns the processing context for changes.
    pub fn context_mut(&mut self) -> &mut ProcessingContext {
        &mut self.context
    }

    /// Consumes the pipeline, returning its context.
    #[must_use]
    pub fn into_context(self) -> ProcessingContext {
        self.context
    }

    /// Runs steps `start..=end`.
    ///
    /// With `dry_run` set nothing is executed: the result lists the steps
    /// that would run and the numbers that would be skipped, and neither the
    /// filesystem nor the batch config is touched.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` when no steps are registered or the range is
    /// empty or outside `1..=total_steps`. Step failures are not errors;
    /// they are reported in the returned [`PipelineResult`].
    pub async fn run(
        &mut self,
        start: u32,
        end: u32,
        dry_run: bool,
    ) -> Result<PipelineResult, PipelineError> {
        self.check_range(start, end)?;

        let span = pipeline_span(self.context.batch_id(), start, end, dry_run);

        if dry_run {
            return Ok(span.in_scope(|| self.plan(start, end)));
        }

        self.context.begin_run();
        span.record("run_id", tracing::field::display(self.context.run_id()));
        Ok(self.execute_range(start, end).instrument(span).await)
    }

    /// Runs every step, `1..=total_steps`.
    pub async fn run_all(&mut self, dry_run: bool) -> Result<PipelineResult, PipelineError> {
        let total_steps = self.total_steps();
        self.run(1, total_steps, dry_run).await
    }

    /// Runs from the first incomplete step to the end of the pipeline.
    ///
    /// When every step is already complete, returns a successful empty
    /// result without running anything.
    pub async fn resume(&mut self, dry_run: bool) -> Result<PipelineResult, PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::NoStepsRegistered);
        }

        match self.context.config().next_incomplete_step() {
            Some(first) => {
                info!(
                    batch_id = %self.context.batch_id(),
                    from_step = first,
                    "Resuming pipeline"
                );
                let total_steps = self.total_steps();
                self.run(first, total_steps, dry_run).await
            }
            None => {
                info!(
                    batch_id = %self.context.batch_id(),
                    "All steps already complete; nothing to resume"
                );
                Ok(PipelineResult::empty(dry_run))
            }
        }
    }

    fn check_range(&self, start: u32, end: u32) -> Result<(), PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::NoStepsRegistered);
        }
        let total_steps = self.total_steps();
        if start == 0 || start > end || end > total_steps {
            return Err(PipelineError::InvalidRange {
                start,
                end,
                total_steps,
            });
        }
        Ok(())
    }

    fn plan(&self, start: u32, end: u32) -> PipelineResult {
        let timer = SpanTimer::start();
        let mut result = PipelineResult::empty(true);

        for number in start..=end {
            match self.steps.get(&number) {
                Some(step) => result.planned_steps.push(PlannedStep {
                    step_number: number,
                    step_name: step.step_name().to_string(),
                }),
                None => {
                    warn!(step_number = number, "No step registered; would be skipped");
                    result.skipped_steps.push(number);
                }
            }
        }

        info!(
            planned = result.planned_steps.len(),
            skipped = result.skipped_steps.len(),
            "Dry run planned"
        );
        self.context.emit(
            "pipeline.dry_run",
            Some(serde_json::json!({
                "start": start,
                "end": end,
                "planned_steps": &result.planned_steps,
                "skipped_steps": &result.skipped_steps,
            })),
        );

        result.duration_ms = timer.elapsed_ms();
        result
    }

    async fn execute_range(&mut self, start: u32, end: u32) -> PipelineResult {
        let timer = SpanTimer::start();
        let mut result = PipelineResult::empty(false);

        info!("Pipeline started");
        self.context.emit(
            "pipeline.started",
            Some(serde_json::json!({
                "start": start,
                "end": end,
                "registered_steps": self.steps.keys().collect::<Vec<_>>(),
            })),
        );

        for number in start..=end {
            let Some(step) = self.steps.get(&number).cloned() else {
                warn!(step_number = number, "No step registered; skipping");
                result.skipped_steps.push(number);
                self.context.emit(
                    "step.skipped",
                    Some(serde_json::json!({ "step": number, "reason": "not_registered" })),
                );
                continue;
            };

            let step_result = run_step(step.as_ref(), &mut self.context).await;
            let succeeded = step_result.success;
            if !succeeded {
                result.success = false;
                result.error_message = Some(format!("Step {number} failed: {}", step_result.message));
            }
            result.results.insert(number, step_result);

            if !succeeded {
                break;
            }
            result.steps_completed.push(number);
        }

        result.duration_ms = timer.elapsed_ms();

        if result.success {
            info!(
                steps_completed = result.steps_completed.len(),
                skipped = result.skipped_steps.len(),
                duration_ms = result.duration_ms,
                "Pipeline completed"
            );
            self.context.emit(
                "pipeline.completed",
                Some(serde_json::json!({
                    "steps_completed": &result.steps_completed,
                    "skipped_steps": &result.skipped_steps,
                    "duration_ms": result.duration_ms,
                })),
            );
        } else {
            warn!(
                failed_step = result.failed_step(),
                error = result.error_message.as_deref().unwrap_or_default(),
                duration_ms = result.duration_ms,
                "Pipeline stopped at failed step"
            );
            self.context.emit(
                "pipeline.failed",
                Some(serde_json::json!({
                    "failed_step": result.failed_step(),
                    "steps_completed": &result.steps_completed,
                    "error": &result.error_message,
                    "duration_ms": result.duration_ms,
                })),
            );
        }

        result
    }
}
