//! Observability utilities.

mod spans;

pub use spans::{init_tracing, pipeline_span, step_span, SpanTimer, DEFAULT_FILTER};
