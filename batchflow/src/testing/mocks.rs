//! Mock steps for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::context::ProcessingContext;
use crate::core::{StepResult, ValidationResult};
use crate::steps::StepProcessor;

/// Shared record of the order in which steps executed.
pub type ExecutionLog = Arc<Mutex<Vec<u32>>>;

/// How many times each phase of a [`MockStep`] was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Calls to `validate_inputs`.
    pub validate_inputs: usize,
    /// Calls to `execute`.
    pub execute: usize,
    /// Calls to `validate_outputs`.
    pub validate_outputs: usize,
}

#[derive(Debug, Clone)]
enum Outcome {
    Succeed,
    Fail(String),
    Error(String),
    Panic(String),
}

/// A step whose every phase is scripted.
///
/// By default all three phases pass. Builder methods make a phase fail,
/// return an error, or panic; counters record how often each phase ran.
#[derive(Debug)]
pub struct MockStep {
    number: u32,
    name: String,
    input_errors: Vec<String>,
    input_warnings: Vec<String>,
    output_errors: Vec<String>,
    required_scratch: Vec<String>,
    outcome: Outcome,
    scratch_writes: Vec<(String, serde_json::Value)>,
    output_file: Option<PathBuf>,
    calls: Mutex<CallCounts>,
    observed_steps: Mutex<Vec<Option<u32>>>,
    log: Option<ExecutionLog>,
}

impl MockStep {
    /// Creates a mock step whose phases all pass.
    #[must_use]
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            input_errors: Vec::new(),
            input_warnings: Vec::new(),
            output_errors: Vec::new(),
            required_scratch: Vec::new(),
            outcome: Outcome::Succeed,
            scratch_writes: Vec::new(),
            output_file: None,
            calls: Mutex::new(CallCounts::default()),
            observed_steps: Mutex::new(Vec::new()),
            log: None,
        }
    }

    /// Makes input validation fail.
    #[must_use]
    pub fn with_invalid_inputs(mut self, error: impl Into<String>) -> Self {
        self.input_errors.push(error.into());
        self
    }

    /// Adds a non-blocking input warning.
    #[must_use]
    pub fn with_input_warning(mut self, warning: impl Into<String>) -> Self {
        self.input_warnings.push(warning.into());
        self
    }

    /// Makes output validation fail.
    #[must_use]
    pub fn with_invalid_outputs(mut self, error: impl Into<String>) -> Self {
        self.output_errors.push(error.into());
        self
    }

    /// Requires a scratch key to be present before execution.
    #[must_use]
    pub fn requiring_scratch(mut self, key: impl Into<String>) -> Self {
        self.required_scratch.push(key.into());
        self
    }

    /// Makes `execute` report failure.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.outcome = Outcome::Fail(message.into());
        self
    }

    /// Makes `execute` return an error.
    #[must_use]
    pub fn erroring(mut self, message: impl Into<String>) -> Self {
        self.outcome = Outcome::Error(message.into());
        self
    }

    /// Makes `execute` panic.
    #[must_use]
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.outcome = Outcome::Panic(message.into());
        self
    }

    /// Writes a scratch value during a successful `execute`.
    #[must_use]
    pub fn writing_scratch(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.scratch_writes.push((key.into(), value));
        self
    }

    /// Writes a file under the batch root during a successful `execute`
    /// and requires it in output validation.
    #[must_use]
    pub fn writing_output(mut self, relative: impl Into<PathBuf>) -> Self {
        self.output_file = Some(relative.into());
        self
    }

    /// Appends the step number to `log` on every `execute`.
    #[must_use]
    pub fn with_execution_log(mut self, log: ExecutionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Returns a snapshot of the call counters.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        *self.calls.lock()
    }

    /// Returns `ctx.current_step()` as seen by each `execute` call.
    #[must_use]
    pub fn observed_steps(&self) -> Vec<Option<u32>> {
        self.observed_steps.lock().clone()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        *self.calls.lock() = CallCounts::default();
        self.observed_steps.lock().clear();
    }
}

#[async_trait]
impl StepProcessor for MockStep {
    fn step_number(&self) -> u32 {
        self.number
    }

    fn step_name(&self) -> &str {
        &self.name
    }

    fn validate_inputs(&self, ctx: &ProcessingContext) -> ValidationResult {
        self.calls.lock().validate_inputs += 1;

        let mut result = ValidationResult::valid();
        for error in &self.input_errors {
            result.add_error(error.clone());
        }
        for warning in &self.input_warnings {
            result.add_warning(warning.clone());
        }
        for key in &self.required_scratch {
            result.require_scratch_key(ctx.scratch(), key);
        }
        result
    }

    async fn execute(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        self.calls.lock().execute += 1;
        self.observed_steps.lock().push(ctx.current_step());
        if let Some(log) = &self.log {
            log.lock().push(self.number);
        }

        match &self.outcome {
            Outcome::Succeed => {}
            Outcome::Fail(message) => return Ok(StepResult::failure(message.clone())),
            Outcome::Error(message) => anyhow::bail!("{message}"),
            Outcome::Panic(message) => panic!("{message}"),
        }

        for (key, value) in &self.scratch_writes {
            ctx.scratch_mut().insert(key.clone(), value.clone());
        }

        let mut files = Vec::new();
        if let Some(relative) = &self.output_file {
            let path = ctx.paths().resolve(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, self.name.as_bytes())?;
            files.push(path);
        }

        Ok(StepResult::success(format!("{} done", self.name)).with_files(files))
    }

    fn validate_outputs(&self, ctx: &ProcessingContext) -> ValidationResult {
        self.calls.lock().validate_outputs += 1;

        let mut result = ValidationResult::valid();
        for error in &self.output_errors {
            result.add_error(error.clone());
        }
        if let Some(relative) = &self.output_file {
            result.require_file(&ctx.paths().resolve(relative), "step output");
        }
        result
    }
}
