//! Lifecycle events for pipeline runs.
//!
//! The orchestrator and the step runner emit events such as
//! `pipeline.started`, `step.completed`, and `step.failed` through the sink
//! held by the [`ProcessingContext`](crate::context::ProcessingContext).
//! There is no global sink: each context carries its own, so tests can swap
//! in a fresh [`CollectingEventSink`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
