use crate::env::{env_opt, parse_flag, LOGPUSH_MIRROR_ENV, LOGPUSH_SERVICE_ID_ENV, LOGPUSH_TIMEOUT_MS_ENV, LOGPUSH_URL_ENV};
use crate::error::AgentError;
use crate::logger::{Console, Logger};
use crate::metadata::{unwrap_metadata, MetadataInit};
use crate::record::{FlushPayload, LogEntry, LogLevel, Metadata};
use crate::serialize::stringify_arg_list;
use crate::sink::LogSink;
use crate::value::Value;
use chrono::{DateTime, Local, Utc};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Configuration for an [`Agent`] that pushes over HTTP.
///
/// **Fields**
/// - `url`: ingester URL; see [`Endpoint::resolve`](crate::endpoint::Endpoint::resolve)
///   for how the push path and credentials are derived from it.
/// - `service_id`: appended to the default push path when `url` has none.
/// - `meta`: static metadata copied into every flush payload.
/// - `mirror`: echo every appended entry to stderr.
/// - `timeout`: optional per-request timeout of the HTTP transport.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub url: String,
    pub service_id: Option<String>,
    pub meta: MetadataInit,
    pub mirror: bool,
    pub timeout: Option<Duration>,
}

impl AgentConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_id: None,
            meta: MetadataInit::new(),
            mirror: true,
            timeout: None,
        }
    }

    pub fn service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn meta(mut self, meta: MetadataInit) -> Self {
        self.meta = meta;
        self
    }

    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a config from `LOGPUSH_*` environment variables.
    ///
    /// Returns `None` when `LOGPUSH_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let mut config = Self::new(env_opt(LOGPUSH_URL_ENV)?);
        config.service_id = env_opt(LOGPUSH_SERVICE_ID_ENV);
        if let Some(mirror) = env_opt(LOGPUSH_MIRROR_ENV) {
            config.mirror = parse_flag(&mirror);
        }
        config.timeout = env_opt(LOGPUSH_TIMEOUT_MS_ENV)
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .map(Duration::from_millis);
        Some(config)
    }
}

/// In-memory log buffer bound to one push destination.
///
/// Holds static metadata (copied into every payload) and an ordered queue
/// of [`LogEntry`]s. Appends are synchronous and never fail; [`flush`](Self::flush)
/// ships the queue as one request and only drops what that request carried.
///
/// Flushes are serialized: a flush started while another is in flight
/// waits for it, so the same entries are never submitted twice.
pub struct Agent {
    meta: Metadata,
    entries: Mutex<Vec<LogEntry>>,
    sink: Arc<dyn LogSink>,
    flush_guard: tokio::sync::Mutex<()>,
    mirror: bool,
}

impl Agent {
    /// Create an agent pushing to the logpush ingester at `url`.
    #[cfg(feature = "http")]
    pub fn new(url: &str, meta: MetadataInit) -> Result<Self, AgentError> {
        Self::from_config(AgentConfig::new(url).meta(meta))
    }

    #[cfg(feature = "http")]
    pub fn from_config(config: AgentConfig) -> Result<Self, AgentError> {
        use crate::endpoint::Endpoint;
        use crate::http::HttpSink;

        let endpoint = Endpoint::resolve(&config.url, config.service_id.as_deref())?;
        let sink = HttpSink::new(endpoint, config.timeout).map_err(AgentError::Client)?;
        Ok(Self::with_sink(Arc::new(sink), config.meta).mirror(config.mirror))
    }

    /// Create an agent around any [`LogSink`]. Mirroring is on by default.
    pub fn with_sink(sink: Arc<dyn LogSink>, meta: MetadataInit) -> Self {
        Self {
            meta: unwrap_metadata(Some(&meta)).unwrap_or_default(),
            entries: Mutex::new(Vec::new()),
            sink,
            flush_guard: tokio::sync::Mutex::new(()),
            mirror: true,
        }
    }

    /// Enable or disable the stderr mirror.
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Static metadata sent with every flush.
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Structured logging façade.
    pub fn logger(&self) -> Logger<'_> {
        Logger::new(self)
    }

    /// Console-compatible façade.
    pub fn console(&self) -> Console<'_> {
        Console::new(self)
    }

    /// Queue an entry stamped with the current time.
    pub fn append(&self, level: LogLevel, message: impl Into<String>, meta: Option<&MetadataInit>) {
        let now = Utc::now();
        let entry = LogEntry::new(now, level, message.into(), unwrap_metadata(meta));
        let line = self.mirror.then(|| mirror_line(&now, &entry));

        self.lock_entries().push(entry);

        if let Some(line) = line {
            // Best effort: a closed or full stderr must not affect the buffer.
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    /// Queue a console-style entry built from heterogeneous values.
    pub fn append_values(&self, level: LogLevel, values: &[Value]) {
        self.append(level, stringify_arg_list(values), None);
    }

    /// Push all queued entries as one payload.
    ///
    /// **Returns**
    /// - `Ok(())` immediately, without any request, when nothing is queued.
    /// - `Ok(())` after the sink accepted the payload; the sent entries
    ///   are removed, entries appended meanwhile stay queued.
    /// - `Err(AgentError::Flush(..))` if the sink failed; the queue is left
    ///   exactly as it was.
    pub async fn flush(&self) -> Result<(), AgentError> {
        if self.is_empty() {
            return Ok(());
        }

        let _in_flight = self.flush_guard.lock().await;

        let entries = self.lock_entries().clone();
        if entries.is_empty() {
            return Ok(());
        }

        let count = entries.len();
        let payload = FlushPayload {
            meta: self.meta.clone(),
            entries,
        };

        debug!(entries = count, "pushing log entries");
        self.sink.push(&payload).await?;

        let mut queued = self.lock_entries();
        let sent = count.min(queued.len());
        queued.drain(..sent);
        debug!(entries = count, remaining = queued.len(), "log entries pushed");
        Ok(())
    }

    /// Snapshot of the queued entries, oldest first.
    pub fn pending(&self) -> Vec<LogEntry> {
        self.lock_entries().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Human-readable mirror line: `YYYY/MM/DD HH:MM:SS LEVEL message`, local
/// time, followed by the entry metadata as JSON when it has any.
pub fn mirror_line(timestamp: &DateTime<Utc>, entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {} {}",
        timestamp.with_timezone(&Local).format("%Y/%m/%d %H:%M:%S"),
        entry.level.as_str().to_uppercase(),
        entry.message
    );
    if let Some(meta) = &entry.meta {
        if let Ok(json) = serde_json::to_string(meta) {
            line.push(' ');
            line.push_str(&json);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::error::SinkError;
    use crate::sink::MemorySink;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::{OnceLock, Weak};

    fn agent(sink: &Arc<MemorySink>) -> Agent {
        Agent::with_sink(sink.clone(), MetadataInit::from([("env", "dev"), ("api", " ")])).mirror(false)
    }

    #[test]
    fn new_agent_is_empty_with_normalized_static_meta() {
        let sink = Arc::new(MemorySink::new());
        let agent = agent(&sink);
        assert!(agent.is_empty());
        assert_eq!(agent.meta(), &Metadata::from([("env".to_string(), "dev".to_string())]));
    }

    #[test]
    fn append_keeps_order_and_meta_presence() {
        let sink = Arc::new(MemorySink::new());
        let agent = agent(&sink);

        agent.append(LogLevel::Info, "first", None);
        agent.append(LogLevel::Warn, "second", Some(&MetadataInit::new().with("code", 500)));
        agent.append(LogLevel::Debug, "third", Some(&MetadataInit::new()));

        let pending = agent.pending();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].message, "first");
        assert_eq!(pending[0].meta, None);
        assert_eq!(pending[1].meta.as_ref().and_then(|m| m.get("code")).map(String::as_str), Some("500"));
        assert_eq!(pending[2].meta, Some(Metadata::new()));
        assert!(pending[0].date <= pending[2].date);
    }

    #[test]
    fn append_values_serializes_and_joins() {
        let sink = Arc::new(MemorySink::new());
        let agent = agent(&sink);

        agent.append_values(LogLevel::Log, &args![true, 42, Value::regexp("a", "i")]);

        let pending = agent.pending();
        assert_eq!(pending[0].message, "true 42 /a/i");
        assert_eq!(pending[0].level, LogLevel::Log);
        assert_eq!(pending[0].meta, None);
    }

    #[test]
    fn append_with_mirror_enabled_still_queues() {
        let sink = Arc::new(MemorySink::new());
        let agent = Agent::with_sink(sink, MetadataInit::new());
        agent.append(LogLevel::Error, "mirrored", None);
        assert_eq!(agent.len(), 1);
    }

    #[test]
    fn mirror_line_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let entry = LogEntry::new(ts, LogLevel::Warn, "disk almost full".to_string(), None);
        let local = ts.with_timezone(&Local).format("%Y/%m/%d %H:%M:%S").to_string();
        assert_eq!(mirror_line(&ts, &entry), format!("{local} WARN disk almost full"));

        let meta = unwrap_metadata(Some(&MetadataInit::new().with("disk", "/var").with("used", 97)));
        let entry = LogEntry::new(ts, LogLevel::Warn, "disk almost full".to_string(), meta);
        assert_eq!(
            mirror_line(&ts, &entry),
            format!(r#"{local} WARN disk almost full {{"disk":"/var","used":"97"}}"#)
        );
    }

    #[tokio::test]
    async fn flush_on_empty_buffer_makes_no_call() {
        let sink = Arc::new(MemorySink::new());
        let agent = agent(&sink);
        agent.flush().await.unwrap();
        assert_eq!(sink.attempts(), 0);
    }

    #[tokio::test]
    async fn successful_flush_sends_in_order_and_clears() {
        let sink = Arc::new(MemorySink::new());
        let agent = agent(&sink);

        agent.logger().info("start");
        agent.logger().error_with("boom", &MetadataInit::new().with("code", 500));
        agent.flush().await.unwrap();

        assert!(agent.is_empty());
        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].meta.get("env").map(String::as_str), Some("dev"));
        let entries = &payloads[0].entries;
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].level, entries[0].message.as_str()), (LogLevel::Info, "start"));
        assert_eq!((entries[1].level, entries[1].message.as_str()), (LogLevel::Error, "boom"));
        assert_eq!(entries[1].meta.as_ref().and_then(|m| m.get("code")).map(String::as_str), Some("500"));

        agent.flush().await.unwrap();
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test]
    async fn failed_flush_leaves_buffer_untouched_and_next_flush_resends() {
        let sink = Arc::new(MemorySink::new());
        let agent = agent(&sink);

        agent.append(LogLevel::Info, "one", None);
        agent.append(LogLevel::Info, "two", Some(&MetadataInit::new().with("k", "v")));
        let before = agent.pending();

        sink.reject_with(503, "ingester down");
        let err = agent.flush().await.unwrap_err();
        assert!(err.to_string().contains("ingester down"));
        assert_eq!(agent.pending(), before);

        agent.append(LogLevel::Info, "three", None);
        sink.accept();
        agent.flush().await.unwrap();

        let payloads = sink.payloads();
        let messages: Vec<_> = payloads[0].entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["one", "two", "three"]);
        assert_eq!(payloads[0].entries[..2], before[..]);
        assert!(agent.is_empty());
    }

    /// Sink that stays inside `push` for a while, optionally appending to
    /// the agent before it returns.
    #[derive(Default)]
    struct SlowSink {
        payloads: Mutex<Vec<FlushPayload>>,
        agent: OnceLock<Weak<Agent>>,
    }

    #[async_trait]
    impl LogSink for SlowSink {
        async fn push(&self, payload: &FlushPayload) -> Result<(), SinkError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if let Some(agent) = self.agent.get().and_then(Weak::upgrade) {
                agent.append(LogLevel::Info, "during", None);
            }
            self.payloads.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn messages(payloads: &[FlushPayload]) -> Vec<Vec<String>> {
        payloads
            .iter()
            .map(|p| p.entries.iter().map(|e| e.message.clone()).collect())
            .collect()
    }

    #[tokio::test]
    async fn overlapping_flushes_do_not_resend_entries() {
        let sink = Arc::new(SlowSink::default());
        let agent = Arc::new(Agent::with_sink(sink.clone(), MetadataInit::new()).mirror(false));
        for i in 0..3 {
            agent.append(LogLevel::Debug, format!("e{i}"), None);
        }

        let (a, b) = tokio::join!(agent.flush(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            agent.append(LogLevel::Debug, "during", None);
            agent.flush().await
        });
        a.unwrap();
        b.unwrap();

        assert_eq!(
            messages(&sink.payloads.lock().unwrap()),
            [vec!["e0", "e1", "e2"], vec!["during"]]
        );
        assert!(agent.is_empty());
    }

    #[tokio::test]
    async fn entries_appended_during_push_stay_queued() {
        let sink = Arc::new(SlowSink::default());
        let agent = Arc::new(Agent::with_sink(sink.clone(), MetadataInit::new()).mirror(false));
        sink.agent.set(Arc::downgrade(&agent)).unwrap();

        agent.append(LogLevel::Info, "one", None);
        agent.append(LogLevel::Info, "two", None);
        agent.flush().await.unwrap();

        assert_eq!(messages(&sink.payloads.lock().unwrap()), [vec!["one", "two"]]);
        let pending = agent.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message, "during");
    }
}
