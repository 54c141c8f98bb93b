//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::fmt;
use std::time::Duration;

use platform::config::Config;
use platform::cookie::CookieConfig;

/// Deadline applied to store calls made on behalf of one request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Access token lifetime (JWT `exp` and cookie expiry)
    pub access_token_ttl: Duration,
    /// HS512 signing secret
    pub jwt_secret: Vec<u8>,
    /// Access-token cookie attributes
    pub cookie: CookieConfig,
    /// Per-request deadline for store calls
    pub request_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from_config(&Config::defaults())
    }
}

impl AuthConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_token_ttl: config.access_token_ttl,
            jwt_secret: config.jwt_secret.clone(),
            cookie: CookieConfig::access_token(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("jwt_secret", &"[REDACTED]")
            .field("cookie", &self.cookie)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
