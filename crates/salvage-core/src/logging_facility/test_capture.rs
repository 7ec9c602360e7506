//! In-memory capture of log events for run-level assertions
//!
//! Lifecycle fields (`op`, `event`, `run_id`, `err_code`, `duration_ms`) are
//! lifted out of each event so tests can follow one recovery run through a
//! log shared with every other test in the binary.

use crate::__schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One captured event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    /// `start`, `end` or `end_error` for lifecycle events
    pub event: Option<String>,
    pub run_id: Option<String>,
    pub err_code: Option<String>,
    pub duration_ms: Option<u64>,
    pub message: Option<String>,
    /// Every other field, rendered as text
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn from_fields(level: Level, mut fields: HashMap<String, String>) -> Self {
        Self {
            level,
            op: fields.remove("op"),
            event: fields.remove("event"),
            run_id: fields.remove("run_id"),
            err_code: fields.remove("err_code"),
            duration_ms: fields.remove("duration_ms").and_then(|v| v.parse().ok()),
            message: fields.remove("message"),
            fields,
        }
    }

    pub fn is(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct FieldText(HashMap<String, String>);

impl Visit for FieldText {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut text = FieldText::default();
        event.record(&mut text);
        let captured = CapturedEvent::from_fields(*event.metadata().level(), text.0);

        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

/// Shared handle on the captured events
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.select(|e| e.op.as_deref() == Some(op))
    }

    /// Everything logged with this run's id, in emission order
    pub fn events_for_run(&self, run_id: &str) -> Vec<CapturedEvent> {
        self.select(|e| e.run_id.as_deref() == Some(run_id))
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.select(predicate).len()
    }

    /// # Panics
    ///
    /// Panics if no event matches `op` and `event`.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        assert!(
            events.iter().any(|e| e.is(op, event)),
            "Expected event op={} event={} not found in {} captured events",
            op,
            event,
            events.len()
        );
    }

    /// Check that `run_id` logged one `start` and one `end` for `op`, and
    /// return the `end` event
    ///
    /// # Panics
    ///
    /// Panics if the run did not complete cleanly.
    pub fn assert_run_completed(&self, op: &str, run_id: &str) -> CapturedEvent {
        let run = self.events_for_run(run_id);
        let starts = run.iter().filter(|e| e.is(op, EVENT_START)).count();
        let ends: Vec<_> = run.iter().filter(|e| e.is(op, EVENT_END)).collect();
        let errors = run.iter().filter(|e| e.is(op, EVENT_END_ERROR)).count();
        assert_eq!(starts, 1, "run {} of {} should start once", run_id, op);
        assert_eq!(errors, 0, "run {} of {} logged an error", run_id, op);
        assert_eq!(ends.len(), 1, "run {} of {} should end once", run_id, op);
        ends[0].clone()
    }

    /// The `end_error` events of `op` carrying `err_code`
    pub fn failures(&self, op: &str, err_code: &str) -> Vec<CapturedEvent> {
        self.select(|e| e.is(op, EVENT_END_ERROR) && e.err_code.as_deref() == Some(err_code))
    }

    fn select<F>(&self, predicate: F) -> Vec<CapturedEvent>
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as the global subscriber (once per process)
/// and return the shared handle
///
/// Tests in one binary share the buffer, so assertions should filter on a
/// run id or a unique op name.
///
/// # Example
///
/// ```
/// use salvage_core::logging_facility::test_capture::init_test_capture;
/// use salvage_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_capture_op", "run-1");
/// capture.assert_event_exists("doc_capture_op", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let events = Arc::new(Mutex::new(Vec::new()));
            let layer = CaptureLayer {
                events: events.clone(),
            };
            tracing_subscriber::registry().with(layer).init();
            TestCapture { events }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_fields_are_lifted_out() {
        let fields: HashMap<String, String> = [
            ("op", "recover"),
            ("event", "end_error"),
            ("run_id", "r-1"),
            ("err_code", "ERR_SOURCE_UNAVAILABLE"),
            ("duration_ms", "12"),
            ("folder", "A"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let event = CapturedEvent::from_fields(Level::ERROR, fields);

        assert!(event.is("recover", "end_error"));
        assert_eq!(event.run_id.as_deref(), Some("r-1"));
        assert_eq!(event.err_code.as_deref(), Some("ERR_SOURCE_UNAVAILABLE"));
        assert_eq!(event.duration_ms, Some(12));
        assert_eq!(event.field("folder"), Some("A"));
        assert!(event.field("op").is_none());
    }
}
