//! Testing utilities for batchflow pipelines.
//!
//! This module provides:
//! - A configurable mock step with per-phase call counters
//! - An on-disk batch fixture in a temporary directory
//! - Assertions for step and pipeline results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_pipeline_completed, assert_pipeline_stopped_at, assert_step_failed_in,
    assert_step_succeeded,
};
pub use fixtures::{write_batch_config, TestBatch};
pub use mocks::{CallCounts, ExecutionLog, MockStep};
