//! On-disk batch fixtures for pipeline testing.

#![allow(clippy::expect_used)]

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::{BatchConfig, ConfigManager, DEFAULT_TOTAL_STEPS};
use crate::context::{BatchPaths, ProcessingContext};
use crate::events::CollectingEventSink;
use crate::pipeline::Pipeline;

/// A batch laid out in a temporary directory.
///
/// The directory tree and a fresh config (every step incomplete) are
/// created up front; everything is removed when the fixture is dropped.
#[derive(Debug)]
pub struct TestBatch {
    dir: TempDir,
    paths: BatchPaths,
    batch_id: String,
    total_steps: u32,
}

impl TestBatch {
    /// Creates a batch with the default step count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_total_steps(DEFAULT_TOTAL_STEPS)
    }

    /// Creates a batch with `total_steps` steps.
    #[must_use]
    pub fn with_total_steps(total_steps: u32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let paths = BatchPaths::new(dir.path().join("test_batch"));
        paths.ensure_layout().expect("create batch layout");
        ConfigManager::create(paths.config_file(), "Test Batch", total_steps)
            .expect("write batch config");

        Self {
            dir,
            paths,
            batch_id: "test_batch".to_string(),
            total_steps,
        }
    }

    /// Marks steps complete in the persisted config.
    #[must_use]
    pub fn with_completed(self, steps: &[u32]) -> Self {
        write_batch_config(self.paths.config_file(), "Test Batch", self.total_steps, steps);
        self
    }

    /// Returns the temporary directory holding the batch.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the batch layout.
    #[must_use]
    pub fn paths(&self) -> &BatchPaths {
        &self.paths
    }

    /// Returns the batch identity used for contexts.
    #[must_use]
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Returns the step count.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Loads the config from disk, ignoring any in-memory copy.
    #[must_use]
    pub fn reload_config(&self) -> ConfigManager {
        ConfigManager::load(self.paths.config_file(), self.total_steps).expect("load batch config")
    }

    /// Builds a processing context over the batch.
    #[must_use]
    pub fn context(&self) -> ProcessingContext {
        ProcessingContext::new(&self.batch_id, self.paths.clone(), self.reload_config())
    }

    /// Builds a processing context that records its events.
    #[must_use]
    pub fn context_with_events(&self) -> (ProcessingContext, Arc<CollectingEventSink>) {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = self.context().with_event_sink(sink.clone());
        (ctx, sink)
    }

    /// Builds an empty pipeline over the batch.
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.context())
    }
}

impl Default for TestBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a batch config with the given steps complete.
pub fn write_batch_config(path: &Path, project_name: &str, total_steps: u32, completed: &[u32]) {
    let mut config = BatchConfig::new(project_name, total_steps);
    for step in completed {
        config.steps_completed.insert(*step, true);
    }
    let value = config.to_json().expect("encode batch config");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create config dir");
    }
    std::fs::write(
        path,
        serde_json::to_vec_pretty(&value).expect("serialize batch config"),
    )
    .expect("write batch config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let batch = TestBatch::new();
        assert!(batch.paths().csv_dir().is_dir());
        assert!(batch.paths().config_file().is_file());
        assert!(batch.paths().root().starts_with(batch.temp_dir()));

        let config = batch.reload_config();
        assert_eq!(config.completed_count(), 0);
        assert_eq!(config.total_steps(), DEFAULT_TOTAL_STEPS);
    }

    #[test]
    fn test_with_completed() {
        let batch = TestBatch::with_total_steps(4).with_completed(&[1, 2]);
        let config = batch.reload_config();
        assert_eq!(config.completed_steps(), vec![1, 2]);
        assert_eq!(config.next_incomplete_step(), Some(3));
    }

    #[test]
    fn test_context_with_events() {
        let batch = TestBatch::new();
        let (ctx, sink) = batch.context_with_events();
        ctx.emit("custom", None);
        assert_eq!(sink.event_types(), vec!["custom"]);
    }
}
