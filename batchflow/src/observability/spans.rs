//! Tracing setup and span helpers for batch pipelines.
//!
//! Every pipeline run is wrapped in a `pipeline` span and every step in a
//! nested `step` span, so log lines from a step carry the batch, run, and
//! step they belong to.

use crate::config::LogFormat;
use crate::errors::BatchflowError;
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`.
///
/// # Errors
///
/// Returns `BatchflowError::Logging` if a global subscriber is already set.
/// Tests that call this more than once can ignore the error.
pub fn init_tracing(format: LogFormat) -> Result<(), BatchflowError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .try_init(),
    };
    installed.map_err(|err| BatchflowError::Logging(err.to_string()))
}

/// Creates the span for one pipeline run.
///
/// `run_id` starts empty and is recorded once the run begins; dry runs
/// never get one.
#[must_use]
pub fn pipeline_span(batch_id: &str, start: u32, end: u32, dry_run: bool) -> Span {
    info_span!(
        "pipeline",
        batch_id = %batch_id,
        run_id = tracing::field::Empty,
        start,
        end,
        dry_run,
    )
}

/// Creates the span for one step's lifecycle.
#[must_use]
pub fn step_span(step_number: u32, step_name: &str, batch_id: &str) -> Span {
    info_span!(
        "step",
        step_number,
        step_name = %step_name,
        batch_id = %batch_id,
    )
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}
