//! The mutable context for one batch's pipeline runs.

use super::{BatchPaths, ScratchSpace};
use crate::config::{ConfigManager, Settings};
use crate::errors::{BatchflowError, RegistryError};
use crate::events::{EventSink, NoOpEventSink};
use crate::registry::BatchRegistry;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a step can see and change while it runs.
///
/// Built fresh for each pipeline invocation. The config manager persists
/// what must survive a restart; the scratch space does not.
pub struct ProcessingContext {
    batch_id: String,
    run_id: Uuid,
    paths: BatchPaths,
    config: ConfigManager,
    event_sink: Arc<dyn EventSink>,
    current_step: Option<u32>,
    scratch: ScratchSpace,
}

impl ProcessingContext {
    /// Creates a context for a batch.
    #[must_use]
    pub fn new(batch_id: impl Into<String>, paths: BatchPaths, config: ConfigManager) -> Self {
        Self {
            batch_id: batch_id.into(),
            run_id: Uuid::now_v7(),
            paths,
            config,
            event_sink: Arc::new(NoOpEventSink),
            current_step: None,
            scratch: ScratchSpace::new(),
        }
    }

    /// Opens a registered batch for processing.
    ///
    /// Stamps the batch's last-accessed time, loads its config, and builds a
    /// context over its data directory.
    pub fn open(
        registry: &mut BatchRegistry,
        batch_id: &str,
        settings: &Settings,
    ) -> Result<Self, BatchflowError> {
        let record = registry
            .get_batch(batch_id)
            .ok_or_else(|| RegistryError::NotFound(batch_id.to_string()))?;
        let paths = BatchPaths::with_config_file(&record.data_directory, &record.config_path);

        let config = ConfigManager::load(paths.config_file(), settings.total_steps)?;
        registry.update_last_accessed(batch_id)?;

        tracing::info!(
            batch_id = %batch_id,
            project = %config.project_name(),
            completed = config.completed_count(),
            "Opened batch"
        );
        Ok(Self::new(batch_id, paths, config))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Starts a new run: fresh run id, empty scratch space, no current step.
    pub fn begin_run(&mut self) {
        self.run_id = Uuid::now_v7();
        self.scratch.clear();
        self.current_step = None;
    }

    /// Returns the batch identity.
    #[must_use]
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Returns the id of the current run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the batch directory layout.
    #[must_use]
    pub fn paths(&self) -> &BatchPaths {
        &self.paths
    }

    /// Returns the batch config.
    #[must_use]
    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// Returns the batch config for changes.
    pub fn config_mut(&mut self) -> &mut ConfigManager {
        &mut self.config
    }

    /// Returns the number of the step being run, if any.
    #[must_use]
    pub fn current_step(&self) -> Option<u32> {
        self.current_step
    }

    pub(crate) fn set_current_step(&mut self, step: u32) {
        self.current_step = Some(step);
    }

    /// Returns the scratch space.
    #[must_use]
    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Returns the scratch space for changes.
    pub fn scratch_mut(&mut self) -> &mut ScratchSpace {
        &mut self.scratch
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event tagged with the batch, run, and current step.
    pub fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert("batch_id".to_string(), serde_json::json!(&self.batch_id));
            map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
            if let Some(step) = self.current_step {
                map.entry("step").or_insert_with(|| serde_json::json!(step));
            }
        }

        self.event_sink.emit(event_type, Some(enriched));
    }
}

impl fmt::Debug for ProcessingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("batch_id", &self.batch_id)
            .field("run_id", &self.run_id)
            .field("paths", &self.paths)
            .field("config", &self.config.path())
            .field("current_step", &self.current_step)
            .field("scratch_keys", &self.scratch.keys())
            .finish_non_exhaustive()
    }
}
