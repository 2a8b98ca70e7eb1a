//! Pipeline orchestration.
//!
//! A [`Pipeline`] holds the registered steps of one batch and runs a
//! contiguous, ascending range of them against a single
//! [`ProcessingContext`](crate::context::ProcessingContext), stopping at the
//! first failure.

#[cfg(test)]
mod integration_tests;
mod orchestrator;

pub use orchestrator::Pipeline;
