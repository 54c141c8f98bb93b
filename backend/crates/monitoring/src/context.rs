//! Request context carrier
//!
//! [`RequestContext`] travels with one request: the request-scoped monitor,
//! the authenticated identity once the guard has run, and an optional
//! deadline for downstream work.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use kernel::identity::Identity;
use platform::config::Config;
use tokio::time::Instant;

use crate::monitor::{Monitor, SharedMonitor, StructuredMonitor};

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    monitor: Option<SharedMonitor>,
    identity: Option<Identity>,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitor(mut self, monitor: SharedMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Monitor bound to this context
    ///
    /// Never fails: without one, a fresh logging-only monitor tagged from the
    /// process config is created (and announces itself).
    pub fn monitor(&self) -> SharedMonitor {
        if let Some(monitor) = &self.monitor {
            return Arc::clone(monitor);
        }

        let monitor = StructuredMonitor::minimal(Config::global(), false);
        monitor.info("New logger created as monitor not found in ctx");
        Arc::new(monitor)
    }

    pub fn has_monitor(&self) -> bool {
        self.monitor.is_some()
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fresh context carrying only this context's monitor
    ///
    /// For work that outlives the request (identity and deadline are
    /// dropped).
    pub fn detached(&self) -> Self {
        Self::new().with_monitor(self.monitor())
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
