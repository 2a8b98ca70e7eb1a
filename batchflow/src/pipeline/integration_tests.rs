//! End-to-end tests for pipeline runs over on-disk batches.

use super::Pipeline;
use crate::core::StepPhase;
use crate::errors::PipelineError;
use crate::steps::StepProcessor;
use crate::testing::{
    assert_pipeline_completed, assert_pipeline_stopped_at, assert_step_failed_in, ExecutionLog,
    MockStep, TestBatch,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn register_all(pipeline: &mut Pipeline, steps: &[Arc<MockStep>]) {
    for step in steps {
        pipeline.register_step(step.clone()).unwrap();
    }
}

fn passing_steps(count: u32) -> Vec<Arc<MockStep>> {
    (1..=count)
        .map(|number| Arc::new(MockStep::new(number, format!("Step {number}"))))
        .collect()
}

#[tokio::test]
async fn test_stop_on_failure() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    let steps: Vec<Arc<MockStep>> = (1..=5)
        .map(|number| {
            let step = MockStep::new(number, format!("Step {number}"));
            Arc::new(if number == 3 {
                step.failing("date column unparseable")
            } else {
                step
            })
        })
        .collect();
    register_all(&mut pipeline, &steps);

    let result = pipeline.run(1, 5, false).await.unwrap();

    assert_pipeline_stopped_at(&result, 3, &[1, 2]);
    assert!(result
        .error_message
        .as_deref()
        .unwrap()
        .contains("date column unparseable"));
    assert_eq!(steps[3].calls().validate_inputs, 0);
    assert_eq!(steps[3].calls().execute, 0);
    assert_eq!(steps[4].calls().execute, 0);

    let config = batch.reload_config();
    assert_eq!(config.completed_steps(), vec![1, 2]);
}

#[tokio::test]
async fn test_rerun_after_failure_resumes_at_failed_step() {
    let batch = TestBatch::with_total_steps(3);
    let mut pipeline = batch.pipeline();
    let first = Arc::new(MockStep::new(1, "Normalize"));
    let broken = Arc::new(MockStep::new(2, "Validate").with_invalid_outputs("report missing"));
    let third = Arc::new(MockStep::new(3, "Tag"));
    register_all(&mut pipeline, &[first.clone(), broken, third.clone()]);

    let result = pipeline.run(1, 3, false).await.unwrap();
    assert_step_failed_in(result.step_result(2).unwrap(), StepPhase::OutputValidation);
    assert!(!pipeline.context().config().is_step_complete(2));

    pipeline
        .register_step(Arc::new(MockStep::new(2, "Validate")))
        .unwrap();
    let resumed = pipeline.resume(false).await.unwrap();

    assert_pipeline_completed(&resumed, &[2, 3]);
    assert_eq!(first.calls().execute, 1);
    assert_eq!(third.calls().execute, 1);
    assert_eq!(batch.reload_config().completed_count(), 3);
}

#[tokio::test]
async fn test_double_run_reports_all_steps_both_times() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    let steps = passing_steps(8);
    register_all(&mut pipeline, &steps);

    let first = pipeline.run(1, 8, false).await.unwrap();
    let second = pipeline.run(1, 8, false).await.unwrap();

    let all: Vec<u32> = (1..=8).collect();
    assert_pipeline_completed(&first, &all);
    assert_pipeline_completed(&second, &all);
    assert_eq!(batch.reload_config().completed_count(), 8);
}

#[tokio::test]
async fn test_steps_run_in_ascending_order() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    let log = ExecutionLog::default();

    for number in [4, 1, 3, 2] {
        pipeline
            .register_step(Arc::new(
                MockStep::new(number, format!("Step {number}")).with_execution_log(log.clone()),
            ))
            .unwrap();
    }

    let result = pipeline.run(1, 4, false).await.unwrap();

    assert_pipeline_completed(&result, &[1, 2, 3, 4]);
    assert_eq!(*log.lock(), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let batch = TestBatch::new();
    let (ctx, sink) = batch.context_with_events();
    let mut pipeline = Pipeline::new(ctx);
    let writer = Arc::new(MockStep::new(1, "Normalize").writing_output("csv/normalized.csv"));
    let second = Arc::new(MockStep::new(2, "Validate"));
    pipeline.register_step(writer.clone()).unwrap();
    pipeline.register_step(second.clone()).unwrap();

    let config_before = std::fs::read_to_string(batch.paths().config_file()).unwrap();
    let result = pipeline.run(1, 3, true).await.unwrap();

    assert!(result.success);
    assert!(result.dry_run);
    assert_eq!(
        result
            .planned_steps
            .iter()
            .map(|planned| planned.step_number)
            .collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(result.planned_steps[0].step_name, "Normalize");
    assert_eq!(result.skipped_steps, vec![3]);
    assert!(result.steps_completed.is_empty());
    assert!(result.results.is_empty());

    assert_eq!(writer.calls().validate_inputs, 0);
    assert_eq!(writer.calls().execute, 0);
    assert_eq!(second.calls().execute, 0);
    assert!(!batch.paths().resolve("csv/normalized.csv").exists());
    assert_eq!(
        std::fs::read_to_string(batch.paths().config_file()).unwrap(),
        config_before
    );
    assert_eq!(sink.event_types(), vec!["pipeline.dry_run"]);
}

#[tokio::test]
async fn test_unregistered_step_is_skipped() {
    let batch = TestBatch::new();
    let (ctx, sink) = batch.context_with_events();
    let mut pipeline = Pipeline::new(ctx);
    pipeline.register_step(Arc::new(MockStep::new(1, "Normalize"))).unwrap();
    pipeline.register_step(Arc::new(MockStep::new(3, "Tag"))).unwrap();

    let result = pipeline.run(1, 3, false).await.unwrap();

    assert_pipeline_completed(&result, &[1, 3]);
    assert_eq!(result.skipped_steps, vec![2]);
    assert!(result.step_result(2).is_none());
    assert_eq!(sink.events_of_type("step.skipped").len(), 1);
}

#[tokio::test]
async fn test_panicking_step_is_contained() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    let after = Arc::new(MockStep::new(2, "Validate"));
    pipeline
        .register_step(Arc::new(MockStep::new(1, "Normalize").panicking("bad utf-8")))
        .unwrap();
    pipeline.register_step(after.clone()).unwrap();

    let result = pipeline.run(1, 2, false).await.unwrap();

    assert_pipeline_stopped_at(&result, 1, &[]);
    assert_step_failed_in(result.step_result(1).unwrap(), StepPhase::Execution);
    assert!(result.error_message.unwrap().contains("bad utf-8"));
    assert_eq!(after.calls().execute, 0);
}

#[tokio::test]
async fn test_input_failure_names_the_step() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    pipeline.register_step(Arc::new(MockStep::new(1, "Normalize"))).unwrap();
    pipeline
        .register_step(Arc::new(
            MockStep::new(2, "Validate").with_invalid_inputs("normalized.csv not found"),
        ))
        .unwrap();

    let result = pipeline.run(1, 2, false).await.unwrap();

    assert_pipeline_stopped_at(&result, 2, &[1]);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Step 2 failed: Input validation failed: normalized.csv not found")
    );
}

#[tokio::test]
async fn test_scratch_flows_between_steps_and_resets_per_run() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    pipeline
        .register_step(Arc::new(
            MockStep::new(1, "Normalize").writing_scratch("row_count", serde_json::json!(120)),
        ))
        .unwrap();
    pipeline
        .register_step(Arc::new(MockStep::new(2, "Validate").requiring_scratch("row_count")))
        .unwrap();

    let result = pipeline.run(1, 2, false).await.unwrap();
    assert_pipeline_completed(&result, &[1, 2]);
    assert_eq!(
        pipeline.context().scratch().get("row_count"),
        Some(&serde_json::json!(120))
    );

    // A fresh run starting at step 2 no longer sees step 1's scratch value.
    let rerun = pipeline.run(2, 2, false).await.unwrap();
    assert_pipeline_stopped_at(&rerun, 2, &[]);
    assert_step_failed_in(rerun.step_result(2).unwrap(), StepPhase::InputValidation);
}

#[tokio::test]
async fn test_current_step_bound_during_execute() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    let step = Arc::new(MockStep::new(4, "Convert"));
    pipeline.register_step(step.clone()).unwrap();

    pipeline.run(4, 4, false).await.unwrap();

    assert_eq!(step.observed_steps(), vec![Some(4)]);
}

#[tokio::test]
async fn test_resume_when_everything_is_done() {
    let batch = TestBatch::with_total_steps(2).with_completed(&[1, 2]);
    let mut pipeline = batch.pipeline();
    let step = Arc::new(MockStep::new(1, "Normalize"));
    pipeline.register_step(step.clone()).unwrap();

    let result = pipeline.resume(false).await.unwrap();

    assert!(result.success);
    assert!(result.steps_completed.is_empty());
    assert_eq!(step.calls().execute, 0);
}

#[tokio::test]
async fn test_run_all_covers_every_step() {
    let batch = TestBatch::with_total_steps(3);
    let mut pipeline = batch.pipeline();
    register_all(&mut pipeline, &passing_steps(3));

    let result = pipeline.run_all(false).await.unwrap();
    assert_pipeline_completed(&result, &[1, 2, 3]);
    assert!(result.duration_ms >= 0.0);
}

#[tokio::test]
async fn test_lifecycle_events() {
    let batch = TestBatch::new();
    let (ctx, sink) = batch.context_with_events();
    let mut pipeline = Pipeline::new(ctx);
    pipeline.register_step(Arc::new(MockStep::new(1, "Normalize"))).unwrap();
    pipeline
        .register_step(Arc::new(MockStep::new(2, "Validate").erroring("disk full")))
        .unwrap();

    pipeline.run(1, 2, false).await.unwrap();

    assert_eq!(
        sink.event_types(),
        vec![
            "pipeline.started",
            "step.started",
            "step.completed",
            "step.started",
            "step.failed",
            "pipeline.failed",
        ]
    );
    let run_ids: Vec<_> = sink
        .events()
        .into_iter()
        .map(|(_, data)| data.unwrap()["run_id"].clone())
        .collect();
    assert!(run_ids.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_programmer_errors() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();

    assert_eq!(
        pipeline.run(1, 8, false).await.unwrap_err(),
        PipelineError::NoStepsRegistered
    );
    assert_eq!(
        pipeline.resume(false).await.unwrap_err(),
        PipelineError::NoStepsRegistered
    );

    pipeline.register_step(Arc::new(MockStep::new(1, "Normalize"))).unwrap();
    for (start, end) in [(0, 3), (4, 2), (1, 9)] {
        assert!(matches!(
            pipeline.run(start, end, false).await,
            Err(PipelineError::InvalidRange { .. })
        ));
    }

    let err = pipeline
        .register_step(Arc::new(MockStep::new(9, "Extra")))
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::StepOutOfRange {
            step: 9,
            step_name: "Extra".to_string(),
            total_steps: 8,
        }
    );
}

#[tokio::test]
async fn test_reregistering_replaces_step() {
    let batch = TestBatch::new();
    let mut pipeline = batch.pipeline();
    let old = Arc::new(MockStep::new(1, "Old"));
    let new = Arc::new(MockStep::new(1, "New"));
    pipeline.register_step(old.clone()).unwrap();
    pipeline.register_step(new.clone()).unwrap();

    assert_eq!(pipeline.registered_steps().len(), 1);
    assert_eq!(pipeline.registered_steps()[0].step_name, "New");
    assert!(pipeline.has_step(1));

    pipeline.run(1, 1, false).await.unwrap();
    assert_eq!(old.calls().execute, 0);
    assert_eq!(new.calls().execute, 1);
}

#[tokio::test]
async fn test_register_steps_and_into_context() {
    let batch = TestBatch::with_total_steps(2);
    let mut pipeline = batch.pipeline();
    let steps: Vec<Arc<dyn StepProcessor>> = vec![
        Arc::new(MockStep::new(1, "Normalize")),
        Arc::new(MockStep::new(2, "Validate")),
    ];
    pipeline.register_steps(steps).unwrap();

    pipeline.run_all(false).await.unwrap();

    let ctx = pipeline.into_context();
    assert_eq!(ctx.config().completed_steps(), vec![1, 2]);
}
