//! Error types for batchflow.
//!
//! Step failures are never errors: they travel as failed [`StepResult`]s and
//! [`PipelineResult`]s. The types here cover persistence problems and
//! mistakes in the code driving the pipeline.
//!
//! [`StepResult`]: crate::core::StepResult
//! [`PipelineResult`]: crate::core::PipelineResult

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for batchflow operations.
#[derive(Debug, Error)]
pub enum BatchflowError {
    /// A registry operation failed.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// A per-batch config or settings operation failed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The pipeline was driven incorrectly.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// A scratch-space operation failed.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the batch registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No batch with this identity is registered.
    #[error("Batch '{0}' is not registered")]
    NotFound(String),

    /// The registry document could not be encoded.
    #[error("Failed to serialize batch registry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The registry document could not be written.
    #[error("Failed to write batch registry '{path}': {source}")]
    Persist {
        /// Registry file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Creating a batch's on-disk layout or config failed.
    #[error("Failed to set up batch '{name}': {source}")]
    Setup {
        /// Display name of the batch being created.
        name: String,
        /// Underlying config error.
        #[source]
        source: ConfigError,
    },
}

/// Errors raised while reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a valid document.
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The file could not be written.
    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document could not be encoded.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A step number outside `1..=total_steps` was used.
    #[error("Step {step} is outside the pipeline range 1..={total_steps}")]
    StepOutOfRange {
        /// Offending step number.
        step: u32,
        /// Configured number of steps.
        total_steps: u32,
    },

    /// An environment override could not be parsed.
    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv {
        /// Environment variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

/// Errors caused by driving the pipeline incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// `run` was called before any step was registered.
    #[error("No steps registered; register steps before running the pipeline")]
    NoStepsRegistered,

    /// The requested range is empty or outside the pipeline.
    #[error("Invalid step range {start}..={end} (pipeline has steps 1..={total_steps})")]
    InvalidRange {
        /// First step requested.
        start: u32,
        /// Last step requested.
        end: u32,
        /// Configured number of steps.
        total_steps: u32,
    },

    /// A step declared a number the pipeline cannot hold.
    #[error("Step '{step_name}' has number {step}, outside 1..={total_steps}")]
    StepOutOfRange {
        /// Declared step number.
        step: u32,
        /// Declared step name.
        step_name: String,
        /// Configured number of steps.
        total_steps: u32,
    },
}

/// Errors raised by the processing context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Writing to an existing scratch key with `try_insert`.
    #[error("Scratch conflict: key '{0}' already exists")]
    KeyConflict(String),

    /// A scratch value could not be decoded into the requested type.
    #[error("Scratch value '{key}' has an unexpected shape: {reason}")]
    Decode {
        /// Scratch key.
        key: String,
        /// Decoder message.
        reason: String,
    },
}

/// Result alias for crate-level operations.
pub type Result<T> = std::result::Result<T, BatchflowError>;
