use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// `SENTRY_DSN` is set but cannot be parsed
    #[error("invalid sentry dsn: {0}")]
    InvalidDsn(String),
}
