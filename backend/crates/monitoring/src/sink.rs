//! Log sinks
//!
//! A sink receives fully formatted messages together with the tag set of the
//! monitor that produced them.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::Level;

use crate::monitor::Tags;

pub trait LogSink: Send + Sync + fmt::Debug {
    fn write(&self, level: Level, tags: &Tags, message: &str);

    /// Push buffered output to its destination. May block.
    fn flush(&self) {}
}

/// Emits through `tracing`; the process subscriber decides the format
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: Level, tags: &Tags, message: &str) {
        match level {
            Level::ERROR => tracing::error!(tags = ?tags, "{message}"),
            Level::WARN => tracing::warn!(tags = ?tags, "{message}"),
            Level::INFO => tracing::info!(tags = ?tags, "{message}"),
            Level::DEBUG => tracing::debug!(tags = ?tags, "{message}"),
            _ => tracing::trace!(tags = ?tags, "{message}"),
        }
    }

    fn flush(&self) {
        // errors ignored: stdout may reject fsync-like calls with EINVAL
        let _ = std::io::stdout().flush();
    }
}

/// One line recorded by [`CaptureSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    pub level: Level,
    pub tags: Tags,
    pub message: String,
}

/// In-memory sink for assertions in tests
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<CapturedLine>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<CapturedLine> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|line| line.message).collect()
    }
}

impl LogSink for CaptureSink {
    fn write(&self, level: Level, tags: &Tags, message: &str) {
        let line = CapturedLine {
            level,
            tags: tags.clone(),
            message: message.to_string(),
        };
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink_shares_buffer_across_clones() {
        let sink = CaptureSink::new();
        let clone = sink.clone();

        let mut tags = Tags::new();
        tags.insert("k".to_string(), "v".to_string());
        clone.write(Level::INFO, &tags, "hello");

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].level, Level::INFO);
        assert_eq!(lines[0].tags.get("k").map(String::as_str), Some("v"));
        assert_eq!(lines[0].message, "hello");
    }
}
