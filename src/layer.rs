use crate::agent::Agent;
use crate::metadata::{MetaValue, MetadataInit};
use crate::record::LogLevel;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Event targets never forwarded into the agent: this crate's own
/// diagnostics and the HTTP stack a flush runs on.
const IGNORED_TARGET_PREFIXES: &[&str] = &["logpush_agent", "reqwest", "hyper", "h2", "rustls", "mio"];

/// `tracing_subscriber` layer that appends observed events to an [`Agent`].
///
/// The event's `message` becomes the entry message and every other field
/// becomes per-call metadata (normalized like any other metadata). Events
/// more verbose than the configured maximum level are ignored.
pub struct AgentLayer {
    agent: Arc<Agent>,
    max_level: Level,
    /// Events appended to the agent.
    pub captured_events: Arc<AtomicU64>,
    /// Events skipped by level or target.
    pub ignored_events: Arc<AtomicU64>,
}

impl AgentLayer {
    /// Forward events at `INFO` and above.
    pub fn new(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            max_level: Level::INFO,
            captured_events: Arc::new(AtomicU64::new(0)),
            ignored_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Most verbose level to forward, e.g. `Level::TRACE` for everything.
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }

    fn is_ignored(&self, event: &Event<'_>) -> bool {
        let meta = event.metadata();
        *meta.level() > self.max_level
            || IGNORED_TARGET_PREFIXES
                .iter()
                .any(|prefix| meta.target().starts_with(prefix))
    }
}

impl<S> Layer<S> for AgentLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if self.is_ignored(event) {
            self.ignored_events.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut fields = MetadataInit::new();
        let mut message = String::new();
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        });

        let meta = (!fields.is_empty()).then_some(&fields);
        self.agent
            .append(LogLevel::from(event.metadata().level()), message, meta);
        self.captured_events.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut MetadataInit,
    pub message: &'a mut String,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.fields.insert(field.name(), value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name(), value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = format!("{:?}", value);
        } else {
            self.fields.insert(field.name(), MetaValue::Str(format!("{:?}", value)));
        }
    }
}
