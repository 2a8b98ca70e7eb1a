//! # Batchflow
//!
//! Pipeline orchestration and batch bookkeeping for archival photo and audio
//! collections.
//!
//! A collection ("batch") moves through a fixed, numbered sequence of
//! metadata steps: normalize the spreadsheet, validate it, tag the source
//! images, convert formats, resize, watermark, and so on. Batches are worked
//! on independently, often over days, so the crate provides:
//!
//! - **Step contract**: every step validates its inputs, executes, and
//!   validates its outputs; the lifecycle runner composes the three phases
//! - **Range orchestration**: run a contiguous range of steps, stopping at
//!   the first failure
//! - **Resumability**: completion flags are persisted per batch only after a
//!   step fully succeeds, so re-running a range resumes at the failed step
//! - **Batch registry**: a durable catalogue of every batch's identity,
//!   location, status, and progress
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use batchflow::prelude::*;
//!
//! let settings = Settings::load(None)?;
//! let mut registry = BatchRegistry::open(&settings.registry_path, settings.total_steps);
//! let batch_id = registry.create_batch("Smith Family Papers", "/archive/smith")?;
//!
//! let ctx = ProcessingContext::open(&mut registry, &batch_id, &settings)?;
//! let mut pipeline = Pipeline::new(ctx);
//! pipeline.register_step(Arc::new(NormalizeSpreadsheet::default()))?;
//!
//! let result = pipeline.run(1, 8, false).await?;
//! if !result.success {
//!     eprintln!("{}", result.error_message.unwrap_or_default());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod steps;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BatchConfig, ConfigManager, LogFormat, Settings};
    pub use crate::context::{BatchPaths, ProcessingContext, ScratchSpace};
    pub use crate::core::{
        BatchStatus, PipelineResult, PlannedStep, StepPhase, StepResult, ValidationResult,
    };
    pub use crate::errors::{
        BatchflowError, ConfigError, ContextError, PipelineError, RegistryError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::Pipeline;
    pub use crate::registry::{BatchRecord, BatchRegistry, BatchSummary};
    pub use crate::steps::{run_step, StepProcessor};
    pub use std::sync::Arc;
}
