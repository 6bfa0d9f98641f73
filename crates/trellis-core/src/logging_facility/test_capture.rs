//! In-memory event capture for tests
//!
//! One capture layer is installed per process and shared by every test in
//! it. Filter by `op` or `run_id` so that tests running in parallel do not
//! observe each other's events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;
use trellis_core_types::schema::{FIELD_EVENT, FIELD_OP, FIELD_RUN_ID};

/// One recorded event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub run_id: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Field name to rendered value
#[derive(Default)]
struct Fields(HashMap<String, String>);

// Numeric and bool fields fall back to `record_debug`, which renders them
// the same way `to_string` would.
impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }
}

type EventLog = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer(EventLog);

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visited = Fields::default();
        event.record(&mut visited);
        let Fields(fields) = visited;

        let lookup = |name: &str| fields.get(name).cloned();
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            op: lookup(FIELD_OP),
            event: lookup(FIELD_EVENT),
            run_id: lookup(FIELD_RUN_ID),
            fields,
        };

        if let Ok(mut log) = self.0.lock() {
            log.push(captured);
        }
    }
}

/// Read side of the process-wide capture
#[derive(Clone)]
pub struct TestCapture {
    log: EventLog,
}

impl TestCapture {
    /// Events emitted so far for one operation name, oldest first
    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        match self.log.lock() {
            Ok(log) => log.iter().filter(|e| e.op.as_deref() == Some(op)).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// # Panics
    ///
    /// Panics unless `op` has emitted an event of kind `event`.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let seen = self.events_for_op(op);
        let kinds: Vec<_> = seen.iter().filter_map(|e| e.event.as_deref()).collect();
        assert!(kinds.contains(&event), "{op}: no `{event}` event among {kinds:?}");
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install (once) and return the process-wide capture handle
///
/// ```
/// let capture = trellis_core::logging_facility::test_capture::init_test_capture();
/// trellis_core::log_op_start!("doc_capture_op");
/// capture.assert_event_exists("doc_capture_op", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    let capture = GLOBAL_CAPTURE.get_or_init(|| {
        let log = EventLog::default();
        // Loses to a subscriber installed earlier in the process
        let _ = tracing_subscriber::registry()
            .with(CaptureLayer(Arc::clone(&log)))
            .try_init();
        TestCapture { log }
    });
    capture.clone()
}
