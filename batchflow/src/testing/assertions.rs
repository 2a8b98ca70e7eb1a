//! Test assertions for step and pipeline results.

use crate::core::{PipelineResult, StepPhase, StepResult};

/// Asserts that the step succeeded.
pub fn assert_step_succeeded(result: &StepResult) {
    assert!(
        result.success,
        "Expected success, got failure in {:?}: {}",
        result.failed_phase, result.message
    );
}

/// Asserts that the step failed in the given phase.
pub fn assert_step_failed_in(result: &StepResult, phase: StepPhase) {
    assert!(
        !result.success,
        "Expected failure in {phase}, got success: {}",
        result.message
    );
    assert_eq!(
        result.failed_phase,
        Some(phase),
        "Expected failure in {phase}, got {:?}: {}",
        result.failed_phase,
        result.message
    );
}

/// Asserts that every step in the run succeeded and `completed` ran.
pub fn assert_pipeline_completed(result: &PipelineResult, completed: &[u32]) {
    assert!(
        result.success,
        "Expected pipeline success, got: {:?}",
        result.error_message
    );
    assert_eq!(result.steps_completed, completed);
}

/// Asserts that the run stopped at `step` after completing `completed`.
pub fn assert_pipeline_stopped_at(result: &PipelineResult, step: u32, completed: &[u32]) {
    assert!(!result.success, "Expected the pipeline to stop at step {step}");
    assert_eq!(result.failed_step(), Some(step));
    assert_eq!(result.steps_completed, completed);

    let message = result.error_message.as_deref().unwrap_or_default();
    assert!(
        message.starts_with(&format!("Step {step} ")),
        "Expected error message to reference step {step}, got '{message}'"
    );
    assert!(
        result.results.keys().all(|number| *number <= step),
        "Steps after {step} should not have run: {:?}",
        result.results.keys().collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_assertions() {
        assert_step_succeeded(&StepResult::success("ok"));
        assert_step_failed_in(
            &StepResult::failed_in(StepPhase::OutputValidation, "empty"),
            StepPhase::OutputValidation,
        );
    }

    #[test]
    #[should_panic(expected = "Expected success")]
    fn test_assert_step_succeeded_fails() {
        assert_step_succeeded(&StepResult::failure("boom"));
    }

    #[test]
    #[should_panic(expected = "Expected failure in input_validation")]
    fn test_assert_step_failed_in_wrong_phase() {
        assert_step_failed_in(&StepResult::failure("boom"), StepPhase::InputValidation);
    }

    #[test]
    fn test_pipeline_stopped_at() {
        let mut result = PipelineResult::empty(false);
        result.success = false;
        result.steps_completed = vec![1, 2];
        result.results.insert(1, StepResult::success("ok"));
        result.results.insert(2, StepResult::success("ok"));
        result.results.insert(3, StepResult::failure("bad"));
        result.error_message = Some("Step 3 failed: bad".to_string());

        assert_pipeline_stopped_at(&result, 3, &[1, 2]);
    }
}
