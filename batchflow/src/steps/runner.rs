//! Lifecycle runner: input validation, execution, output validation,
//! completion record.

use super::StepProcessor;
use crate::context::ProcessingContext;
use crate::core::{StepPhase, StepResult, ValidationResult};
use crate::observability::{step_span, SpanTimer};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn, Instrument};

/// Runs one step through its full lifecycle.
///
/// 1. Binds `ctx.current_step` to the step's number.
/// 2. Validates inputs; errors stop here, warnings are only logged.
/// 3. Executes. An `Err` or a panic becomes a failed result.
/// 4. If execution failed, returns that result; outputs are not checked.
/// 5. Validates outputs; a failure here fails the step even though
///    execution reported success.
/// 6. Marks the step complete in the batch config.
///
/// The completion flag is written only after all of the above succeed, so
/// an interrupted or failed step is always re-attempted on the next run.
pub async fn run_step(step: &dyn StepProcessor, ctx: &mut ProcessingContext) -> StepResult {
    let span = step_span(step.step_number(), step.step_name(), ctx.batch_id());
    run_phases(step, ctx).instrument(span).await
}

async fn run_phases(step: &dyn StepProcessor, ctx: &mut ProcessingContext) -> StepResult {
    let number = step.step_number();
    let timer = SpanTimer::start();

    ctx.set_current_step(number);
    ctx.emit(
        "step.started",
        Some(serde_json::json!({ "step": number, "step_name": step.step_name() })),
    );
    info!("Step started");

    let inputs = step.validate_inputs(ctx);
    log_warnings(&inputs, StepPhase::InputValidation);
    if !inputs.is_valid {
        error!(errors = ?inputs.errors, "Input validation failed");
        let result = StepResult::failed_in(
            StepPhase::InputValidation,
            format!("Input validation failed: {}", inputs.error_summary()),
        )
        .with_data("errors", serde_json::json!(inputs.errors));
        return finish(ctx, step, &timer, result);
    }

    let result = match AssertUnwindSafe(step.execute(ctx)).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            error!(error = ?err, "Step execution returned an error");
            StepResult::failure(format!("Execution error: {err:#}"))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(panic = %message, "Step panicked during execution");
            StepResult::failure(format!("Step panicked: {message}"))
        }
    };

    if !result.success {
        let result = if result.failed_phase.is_none() {
            StepResult {
                failed_phase: Some(StepPhase::Execution),
                ..result
            }
        } else {
            result
        };
        return finish(ctx, step, &timer, result);
    }

    let outputs = step.validate_outputs(ctx);
    log_warnings(&outputs, StepPhase::OutputValidation);
    if !outputs.is_valid {
        error!(errors = ?outputs.errors, "Output validation failed after successful execution");
        let failed = StepResult::failed_in(
            StepPhase::OutputValidation,
            format!("Output validation failed: {}", outputs.error_summary()),
        )
        .with_data("errors", serde_json::json!(outputs.errors))
        .with_files(result.files_processed);
        return finish(ctx, step, &timer, failed);
    }

    if let Err(err) = ctx.config_mut().mark_step_complete(number) {
        error!(error = %err, "Could not record step completion");
        let failed = StepResult::failed_in(
            StepPhase::CompletionRecord,
            format!("Step succeeded but its completion could not be recorded: {err}"),
        )
        .with_files(result.files_processed);
        return finish(ctx, step, &timer, failed);
    }

    finish(ctx, step, &timer, result)
}

fn finish(
    ctx: &ProcessingContext,
    step: &dyn StepProcessor,
    timer: &SpanTimer,
    result: StepResult,
) -> StepResult {
    let duration_ms = timer.elapsed_ms();

    if result.success {
        info!(duration_ms, message = %result.message, "Step completed");
        ctx.emit(
            "step.completed",
            Some(serde_json::json!({
                "step": step.step_number(),
                "step_name": step.step_name(),
                "duration_ms": duration_ms,
                "files_processed": result.files_processed.len(),
            })),
        );
    } else {
        warn!(
            duration_ms,
            phase = ?result.failed_phase,
            message = %result.message,
            "Step failed"
        );
        ctx.emit(
            "step.failed",
            Some(serde_json::json!({
                "step": step.step_number(),
                "step_name": step.step_name(),
                "phase": result.failed_phase,
                "error": &result.message,
                "duration_ms": duration_ms,
            })),
        );
    }

    result
}

fn log_warnings(validation: &ValidationResult, phase: StepPhase) {
    for warning in &validation.warnings {
        warn!(phase = %phase, warning = %warning, "Validation warning");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockStep, TestBatch};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_successful_step_marks_completion() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(2, "Validate metadata");

        let result = run_step(&step, &mut ctx).await;

        assert!(result.success);
        assert_eq!(ctx.current_step(), Some(2));
        assert!(ctx.config().is_step_complete(2));
        assert!(batch.reload_config().is_step_complete(2));
        assert_eq!(step.calls().execute, 1);
        assert_eq!(step.calls().validate_outputs, 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs_never_execute() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(1, "Normalize spreadsheet").with_invalid_inputs("csv/ is empty");

        let result = run_step(&step, &mut ctx).await;

        assert!(!result.success);
        assert_eq!(result.failed_phase, Some(StepPhase::InputValidation));
        assert!(result.message.contains("csv/ is empty"));
        assert_eq!(step.calls().execute, 0);
        assert_eq!(step.calls().validate_outputs, 0);
        assert!(!batch.reload_config().is_step_complete(1));
    }

    #[tokio::test]
    async fn test_input_warnings_do_not_block() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(1, "Normalize spreadsheet").with_input_warning("2 empty rows");

        let result = run_step(&step, &mut ctx).await;
        assert!(result.success);
        assert_eq!(step.calls().execute, 1);
    }

    #[tokio::test]
    async fn test_reported_failure_skips_output_validation() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(3, "Tag source images").failing("exiftool exited with 2");

        let result = run_step(&step, &mut ctx).await;

        assert!(!result.success);
        assert_eq!(result.message, "exiftool exited with 2");
        assert_eq!(result.failed_phase, Some(StepPhase::Execution));
        assert_eq!(step.calls().validate_outputs, 0);
        assert!(!ctx.config().is_step_complete(3));
    }

    #[tokio::test]
    async fn test_execute_error_is_contained() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(4, "Convert formats").erroring("codec not found");

        let result = run_step(&step, &mut ctx).await;

        assert!(!result.success);
        assert_eq!(result.failed_phase, Some(StepPhase::Execution));
        assert!(result.message.contains("codec not found"));
    }

    #[tokio::test]
    async fn test_execute_panic_is_contained() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(4, "Convert formats").panicking("index out of bounds");

        let result = run_step(&step, &mut ctx).await;

        assert!(!result.success);
        assert_eq!(result.failed_phase, Some(StepPhase::Execution));
        assert!(result.message.contains("index out of bounds"));
        assert!(!ctx.config().is_step_complete(4));
    }

    #[tokio::test]
    async fn test_invalid_outputs_fail_and_leave_flag_unset() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(5, "Resize").with_invalid_outputs("output/resized is empty");

        let result = run_step(&step, &mut ctx).await;

        assert!(!result.success);
        assert_eq!(result.failed_phase, Some(StepPhase::OutputValidation));
        assert_eq!(step.calls().execute, 1);
        assert!(!ctx.config().is_step_complete(5));
        assert!(!batch.reload_config().is_step_complete(5));
    }

    #[tokio::test]
    async fn test_completion_survives_reload_without_rerun() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(6, "Watermark");

        assert!(run_step(&step, &mut ctx).await.success);

        let first = batch.reload_config();
        let second = batch.reload_config();
        assert!(first.is_step_complete(6));
        assert!(second.is_step_complete(6));
        assert_eq!(step.calls().execute, 1);
    }

    #[tokio::test]
    async fn test_step_outside_config_range_fails_completion_record() {
        let batch = TestBatch::new();
        let mut ctx = batch.context();
        let step = MockStep::new(12, "Extra");

        let result = run_step(&step, &mut ctx).await;

        assert!(!result.success);
        assert_eq!(result.failed_phase, Some(StepPhase::CompletionRecord));
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let batch = TestBatch::new();
        let (mut ctx, sink) = batch.context_with_events();

        run_step(&MockStep::new(1, "Normalize spreadsheet"), &mut ctx).await;
        run_step(&MockStep::new(2, "Validate").failing("bad dates"), &mut ctx).await;

        assert_eq!(
            sink.event_types(),
            vec!["step.started", "step.completed", "step.started", "step.failed"]
        );
        let (_, data) = &sink.events_of_type("step.failed")[0];
        let data = data.as_ref().unwrap();
        assert_eq!(data["step"], serde_json::json!(2));
        assert_eq!(data["phase"], serde_json::json!("execution"));
        assert_eq!(data["batch_id"], serde_json::json!(ctx.batch_id()));
    }

    mockall::mock! {
        Sink {}
        impl crate::events::EventSink for Sink {
            fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
        }
    }

    #[tokio::test]
    async fn test_sink_receives_started_then_completed() {
        let batch = TestBatch::new();
        let mut sink = MockSink::new();
        let mut seq = mockall::Sequence::new();
        sink.expect_emit()
            .withf(|event_type, data| {
                event_type == "step.started"
                    && data.as_ref().is_some_and(|d| d["step_name"] == "Resize")
            })
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_emit()
            .withf(|event_type, data| {
                event_type == "step.completed"
                    && data.as_ref().is_some_and(|d| d["step"] == 5)
            })
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut ctx = batch.context().with_event_sink(std::sync::Arc::new(sink));
        let result = run_step(&MockStep::new(5, "Resize"), &mut ctx).await;

        assert!(result.success);
    }

    #[test]
    fn test_panic_message_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
