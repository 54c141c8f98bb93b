//! Monitoring
//!
//! The [`Monitor`] capability bundles tagged structured logging with optional
//! error reporting. Monitors travel with each request inside a
//! [`RequestContext`].

pub mod context;
pub mod error;
pub mod middleware;
pub mod monitor;
pub mod reporter;
pub mod sink;

pub use context::RequestContext;
pub use error::MonitorError;
pub use monitor::{
    DEFAULT_FLUSH_WAIT, Monitor, NoopMonitor, SharedMonitor, StructuredMonitor, Tags,
};
pub use reporter::{ErrorReporter, SentryReporter};
pub use sink::{CaptureSink, CapturedLine, LogSink, TracingSink};
