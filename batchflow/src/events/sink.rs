//! Event sink trait and implementations.

use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Event type and payload as recorded by [`CollectingEventSink`].
pub type RecordedEvent = (String, Option<serde_json::Value>);

/// Receives lifecycle events.
///
/// `emit` must not fail or block for long; it runs inline with the step
/// sequence.
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "step.started")
    /// * `data` - Optional event data
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        if self.level == Level::DEBUG {
            debug!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
        } else {
            info!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
        }
    }
}

/// A collecting event sink for tests and in-process progress views.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_and_logging_sinks() {
        NoOpEventSink.emit("step.started", Some(serde_json::json!({"step": 1})));
        LoggingEventSink::default().emit("step.started", None);
        LoggingEventSink::debug().emit("step.completed", None);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("pipeline.started", None);
        sink.emit("step.started", Some(serde_json::json!({"step": 1})));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["pipeline.started", "step.started"]);
    }

    #[test]
    fn test_collecting_sink_filter_and_clear() {
        let sink = CollectingEventSink::new();
        sink.emit("step.started", None);
        sink.emit("step.completed", None);
        sink.emit("pipeline.completed", None);

        assert_eq!(sink.events_of_type("step.").len(), 2);
        assert_eq!(sink.events_of_type("pipeline.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
