//! The execution environment handed to every step.
//!
//! This module provides:
//! - The batch directory layout used to resolve step inputs and outputs
//! - A per-run scratch space for values passed between steps
//! - The processing context bundling both with config, events, and identity

mod paths;
mod processing;
mod scratch;

pub use paths::BatchPaths;
pub use processing::ProcessingContext;
pub use scratch::ScratchSpace;
