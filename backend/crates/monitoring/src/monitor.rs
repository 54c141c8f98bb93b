//! Monitor capability
//!
//! A monitor is an immutable bundle of a log sink, an optional error reporter
//! and a tag set. Attaching tags never mutates the receiver; it returns a
//! child monitor owning its own copy of the tags, so a monitor can be shared
//! freely between tasks.
//!
//! ## Usage
//! ```rust,no_run
//! use monitoring::{Monitor, StructuredMonitor, TracingSink};
//! use std::sync::Arc;
//!
//! let root = StructuredMonitor::with_sink(Arc::new(TracingSink), true);
//! let child = root.with_tag("handler", "login");
//! child.info("login attempt");
//! ```

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use platform::config::Config;
use tracing::Level;
use uuid::Uuid;

use crate::error::MonitorError;
use crate::reporter::{ErrorReporter, SentryReporter};
use crate::sink::{LogSink, TracingSink};

/// Default upper bound for [`Monitor::flush`] at shutdown
pub const DEFAULT_FLUSH_WAIT: Duration = Duration::from_secs(10);

pub type Tags = BTreeMap<String, String>;

pub type SharedMonitor = Arc<dyn Monitor>;

pub type FlushFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait Monitor: Send + Sync + fmt::Debug {
    /// Child monitor with one extra tag
    fn with_tag(&self, key: &str, value: &str) -> SharedMonitor;

    /// Child monitor with extra tags; existing keys are overwritten
    fn with_tags(&self, tags: &Tags) -> SharedMonitor;

    /// Logged only in debug mode
    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    /// Log `err` and forward it with the current tags to the reporter
    fn error(&self, err: &(dyn Error + 'static), message: &str);

    fn tags(&self) -> Tags;

    fn debug_mode(&self) -> bool;

    /// Flush the log sink and the reporter concurrently, each bounded by
    /// `max_wait`. Timeouts are swallowed.
    fn flush(&self, max_wait: Duration) -> FlushFuture;
}

// ============================================================================
// Structured monitor
// ============================================================================

#[derive(Clone)]
pub struct StructuredMonitor {
    sink: Arc<dyn LogSink>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    tags: Arc<Tags>,
    debug_mode: bool,
}

impl StructuredMonitor {
    /// Production monitor: tracing sink, base tags, Sentry when
    /// `SENTRY_DSN` is configured
    pub fn new(config: &Config, debug_mode: bool) -> Result<Self, MonitorError> {
        let mut monitor = Self::minimal(config, debug_mode);

        match config.sentry_dsn.as_deref() {
            Some(dsn) => {
                monitor.reporter = Some(Arc::new(SentryReporter::new(dsn, config)?));
            }
            None => monitor.info("Sentry DSN not provided. Not using Sentry Error Reporting"),
        }

        Ok(monitor)
    }

    /// Logging-only monitor tagged from `config`
    pub fn minimal(config: &Config, debug_mode: bool) -> Self {
        let monitor = Self::with_sink(Arc::new(TracingSink), debug_mode)
            .tagged(base_tags(config));
        monitor.info("Logger initialized");
        monitor
    }

    /// Untagged monitor writing to `sink`
    pub fn with_sink(sink: Arc<dyn LogSink>, debug_mode: bool) -> Self {
        Self {
            sink,
            reporter: None,
            tags: Arc::new(Tags::new()),
            debug_mode,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn has_reporter(&self) -> bool {
        self.reporter.is_some()
    }

    /// Same as [`Monitor::with_tags`] but keeps the concrete type
    pub fn tagged(&self, extra: Tags) -> Self {
        let mut tags = (*self.tags).clone();
        tags.extend(extra);

        Self {
            sink: Arc::clone(&self.sink),
            reporter: self.reporter.clone(),
            tags: Arc::new(tags),
            debug_mode: self.debug_mode,
        }
    }
}

fn base_tags(config: &Config) -> Tags {
    [
        ("app", config.service_name.clone()),
        ("service", config.service_name.clone()),
        ("env", config.env.clone()),
        ("version", config.version.clone()),
        ("request_id", Uuid::new_v4().to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl fmt::Debug for StructuredMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredMonitor")
            .field("sink", &self.sink)
            .field("reporter", &self.reporter)
            .field("tags", &self.tags)
            .field("debug_mode", &self.debug_mode)
            .finish()
    }
}

impl Monitor for StructuredMonitor {
    fn with_tag(&self, key: &str, value: &str) -> SharedMonitor {
        let mut extra = Tags::new();
        extra.insert(key.to_string(), value.to_string());
        Arc::new(self.tagged(extra))
    }

    fn with_tags(&self, tags: &Tags) -> SharedMonitor {
        Arc::new(self.tagged(tags.clone()))
    }

    fn debug(&self, message: &str) {
        if self.debug_mode {
            self.sink.write(Level::DEBUG, &self.tags, message);
        }
    }

    fn info(&self, message: &str) {
        self.sink.write(Level::INFO, &self.tags, message);
    }

    fn error(&self, err: &(dyn Error + 'static), message: &str) {
        let line = if message.is_empty() {
            format!("Err: {err}")
        } else {
            format!("{message}. Err: {err}")
        };
        self.sink.write(Level::ERROR, &self.tags, &line);

        if let Some(reporter) = &self.reporter {
            reporter.report(err, &self.tags);
        }
    }

    fn tags(&self) -> Tags {
        (*self.tags).clone()
    }

    fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    fn flush(&self, max_wait: Duration) -> FlushFuture {
        let sink = Arc::clone(&self.sink);
        let reporter = self.reporter.clone();

        Box::pin(async move {
            let logs = tokio::time::timeout(
                max_wait,
                tokio::task::spawn_blocking(move || sink.flush()),
            );
            let reports = tokio::time::timeout(
                max_wait,
                tokio::task::spawn_blocking(move || {
                    if let Some(reporter) = reporter {
                        reporter.flush(max_wait);
                    }
                }),
            );

            // a timed-out flush is dropped silently
            let _ = tokio::join!(logs, reports);
        })
    }
}

// ============================================================================
// No-op monitor
// ============================================================================

/// Monitor that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl Monitor for NoopMonitor {
    fn with_tag(&self, _key: &str, _value: &str) -> SharedMonitor {
        Arc::new(NoopMonitor)
    }

    fn with_tags(&self, _tags: &Tags) -> SharedMonitor {
        Arc::new(NoopMonitor)
    }

    fn debug(&self, _message: &str) {}

    fn info(&self, _message: &str) {}

    fn error(&self, _err: &(dyn Error + 'static), _message: &str) {}

    fn tags(&self) -> Tags {
        Tags::new()
    }

    fn debug_mode(&self) -> bool {
        false
    }

    fn flush(&self, _max_wait: Duration) -> FlushFuture {
        Box::pin(async {})
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CaptureSink;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<(String, Tags)>>,
        flush_delay: Duration,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, err: &(dyn Error + 'static), tags: &Tags) {
            self.reports
                .lock()
                .unwrap()
                .push((err.to_string(), tags.clone()));
        }

        fn flush(&self, _max_wait: Duration) -> bool {
            std::thread::sleep(self.flush_delay);
            true
        }
    }

    fn io_error() -> std::io::Error {
        std::io::Error::other("disk on fire")
    }

    #[test]
    fn test_with_tag_leaves_parent_unchanged() {
        let sink = CaptureSink::new();
        let parent = StructuredMonitor::with_sink(Arc::new(sink.clone()), false);

        let child = parent.with_tag("k", "v");
        let grandchild = child.with_tag("k", "w");

        assert!(parent.tags().is_empty());
        assert_eq!(child.tags().get("k").map(String::as_str), Some("v"));
        assert_eq!(grandchild.tags().get("k").map(String::as_str), Some("w"));

        child.info("from child");
        parent.info("from parent");
        let lines = sink.lines();
        assert_eq!(lines[0].tags.len(), 1);
        assert!(lines[1].tags.is_empty());
    }

    #[test]
    fn test_with_tags_merges() {
        let monitor = StructuredMonitor::with_sink(Arc::new(CaptureSink::new()), false);
        let mut tags = Tags::new();
        tags.insert("a".to_string(), "1".to_string());
        tags.insert("b".to_string(), "2".to_string());

        let child = monitor.with_tag("a", "0").with_tags(&tags);
        assert_eq!(child.tags(), tags);
    }

    #[test]
    fn test_debug_only_in_debug_mode() {
        let sink = CaptureSink::new();
        StructuredMonitor::with_sink(Arc::new(sink.clone()), false).debug("hidden");
        StructuredMonitor::with_sink(Arc::new(sink.clone()), true).debug("shown");

        assert_eq!(sink.messages(), vec!["shown"]);
    }

    #[test]
    fn test_error_logs_and_reports_with_tags() {
        let sink = CaptureSink::new();
        let reporter = Arc::new(RecordingReporter::default());
        let monitor = StructuredMonitor::with_sink(Arc::new(sink.clone()), false)
            .with_reporter(reporter.clone())
            .with_tag("request_id", "r-1");

        monitor.error(&io_error(), "saving user");
        monitor.error(&io_error(), "");

        assert_eq!(
            sink.messages(),
            vec!["saving user. Err: disk on fire", "Err: disk on fire"]
        );
        let lines = sink.lines();
        assert_eq!(lines[0].level, Level::ERROR);

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, "disk on fire");
        assert_eq!(
            reports[0].1.get("request_id").map(String::as_str),
            Some("r-1")
        );
    }

    #[test]
    fn test_minimal_monitor_base_tags() {
        let config = Config::defaults();
        let monitor = StructuredMonitor::minimal(&config, false);
        let tags = monitor.tags();

        for key in ["app", "service", "env", "version", "request_id"] {
            assert!(tags.contains_key(key), "missing tag {key}");
        }
        assert_eq!(tags["env"], "local");
        assert_eq!(tags["version"], "0.0.0");
        assert!(Uuid::parse_str(&tags["request_id"]).is_ok());
        assert!(!monitor.has_reporter());
    }

    #[test]
    fn test_new_without_dsn_has_no_reporter() {
        let monitor = StructuredMonitor::new(&Config::defaults(), true).unwrap();
        assert!(!monitor.has_reporter());
        assert!(monitor.debug_mode());
    }

    #[test]
    fn test_new_with_invalid_dsn_fails() {
        let mut config = Config::defaults();
        config.sentry_dsn = Some("::not-a-dsn::".to_string());
        assert!(matches!(
            StructuredMonitor::new(&config, false),
            Err(MonitorError::InvalidDsn(_))
        ));
    }

    #[test]
    fn test_noop_monitor_is_silent() {
        let monitor = NoopMonitor;
        let child = monitor.with_tag("k", "v");
        child.info("nothing");
        child.error(&io_error(), "nothing");
        assert!(child.tags().is_empty());
        assert!(!child.debug_mode());
    }

    #[tokio::test]
    async fn test_flush_is_bounded_by_max_wait() {
        let reporter = Arc::new(RecordingReporter {
            flush_delay: Duration::from_millis(500),
            ..Default::default()
        });
        let monitor = StructuredMonitor::with_sink(Arc::new(CaptureSink::new()), false)
            .with_reporter(reporter);

        let started = std::time::Instant::now();
        monitor.flush(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_noop_flush_completes() {
        NoopMonitor.flush(Duration::from_millis(10)).await;
    }
}
