//! Error reporting

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use platform::config::Config;
use sentry::types::Dsn;

use crate::error::MonitorError;
use crate::monitor::Tags;

/// Forwards errors to an external collector
pub trait ErrorReporter: Send + Sync + fmt::Debug {
    fn report(&self, err: &(dyn Error + 'static), tags: &Tags);

    /// Block until queued reports are delivered or `max_wait` passes.
    /// Returns `false` on timeout.
    fn flush(&self, max_wait: Duration) -> bool;
}

/// Sentry-backed reporter
///
/// Owns its client; the process-global hub is never bound.
#[derive(Clone)]
pub struct SentryReporter {
    client: Arc<sentry::Client>,
}

impl SentryReporter {
    pub fn new(dsn: &str, config: &Config) -> Result<Self, MonitorError> {
        let dsn = dsn
            .parse::<Dsn>()
            .map_err(|e| MonitorError::InvalidDsn(e.to_string()))?;

        let options = sentry::ClientOptions {
            dsn: Some(dsn),
            attach_stacktrace: true,
            sample_rate: 1.0,
            server_name: Some(config.service_name.clone().into()),
            release: Some(config.version.clone().into()),
            environment: Some(config.env.clone().into()),
            ..Default::default()
        };

        let client = sentry::Client::from(sentry::apply_defaults(options));
        tracing::info!("Sentry Error Reporter initialized");

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

impl fmt::Debug for SentryReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentryReporter")
            .field("enabled", &self.client.is_enabled())
            .finish()
    }
}

impl ErrorReporter for SentryReporter {
    fn report(&self, err: &(dyn Error + 'static), tags: &Tags) {
        let mut scope = sentry::Scope::default();
        for (key, value) in tags {
            scope.set_tag(key, value);
        }

        let event = sentry::event_from_error(err);
        self.client.capture_event(event, Some(&scope));
    }

    fn flush(&self, max_wait: Duration) -> bool {
        self.client.flush(Some(max_wait))
    }
}
