//! The batch registry.
//!
//! This module provides:
//! - [`BatchRegistry`]: the persisted catalogue of batches
//! - [`BatchRecord`] and [`BatchSummary`]: entries and their progress view
//! - Identity generation from display names

mod batch;
mod identity;
mod store;

pub use batch::{BatchRecord, BatchSummary};
pub use identity::{generate_batch_id, slugify};
pub use store::BatchRegistry;
