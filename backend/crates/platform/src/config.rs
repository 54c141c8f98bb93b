//! Layered Configuration
//!
//! Settings are collected into a flat key/value map by an ordered chain of
//! loaders, each overriding the keys set by the previous ones:
//!
//! 1. compiled-in defaults ([`DefaultsLoader`])
//! 2. a `.env`-format file ([`FileLoader`], optional)
//! 3. the process environment ([`EnvLoader`])
//!
//! A loader that fails leaves the map untouched and the chain continues with
//! the values gathered so far. The merged map is converted once into the
//! immutable [`Config`] snapshot.
//!
//! ## Usage
//! ```rust,no_run
//! use platform::config::Config;
//!
//! // Runs the standard loader chain exactly once per process.
//! let config = Config::global();
//! println!("listening on {}", config.port);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// Keys and defaults
// ============================================================================

pub const SERVICE_NAME: &str = "SERVICE_NAME";
pub const PORT: &str = "PORT";
pub const BASE_URL: &str = "BASE_URL";
pub const VERSION: &str = "VERSION";
pub const ENV: &str = "ENV";
pub const ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";
pub const ACCESS_TOKEN_TTL: &str = "ACCESS_TOKEN_TTL";
pub const JWT_SECRET: &str = "JWT_SECRET";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_USER: &str = "DB_USER";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_PASS: &str = "DB_PASS";
pub const DB_SSL_MODE: &str = "DB_SSL_MODE";
pub const SENTRY_DSN: &str = "SENTRY_DSN";

/// Every key the service understands
pub const KNOWN_KEYS: &[&str] = &[
    SERVICE_NAME,
    PORT,
    BASE_URL,
    VERSION,
    ENV,
    ALLOWED_ORIGINS,
    ACCESS_TOKEN_TTL,
    JWT_SECRET,
    DB_HOST,
    DB_PORT,
    DB_USER,
    DB_NAME,
    DB_PASS,
    DB_SSL_MODE,
    SENTRY_DSN,
];

const DEFAULTS: &[(&str, &str)] = &[
    (PORT, "8100"),
    (ENV, "local"),
    (DB_HOST, "127.0.0.1"),
    (DB_PORT, "54321"),
    (DB_USER, "postgres"),
    (DB_PASS, "postgres"),
    (DB_NAME, "db_local"),
    (VERSION, "0.0.0"),
    (JWT_SECRET, "sample_secret"),
];

/// Token lifetime when `ACCESS_TOKEN_TTL` is unset or zero
pub const DEFAULT_ACCESS_TOKEN_TTL_DAYS: u64 = 7;

/// Longest accepted `ACCESS_TOKEN_TTL`; larger values fall back to the default
pub const MAX_ACCESS_TOKEN_TTL_DAYS: u64 = 100 * 365;

const DEFAULT_PORT: u16 = 8100;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const SECS_PER_DAY: u64 = 24 * 3600;

/// Environment tag of production deployments
pub const ENV_PROD: &str = "prod";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be opened or parsed
    #[error("config file {path} unavailable: {source}")]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// An environment variable holds non-unicode data
    #[error("environment variable {0} is not valid unicode")]
    NotUnicode(String),
}

// ============================================================================
// Settings map
// ============================================================================

/// Raw key/value settings gathered by the loader chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Override every key present in `other`
    pub fn merge(&mut self, other: Settings) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }
}

// ============================================================================
// Loaders
// ============================================================================

/// One configuration source in the precedence chain
///
/// Implementations stage their values first and merge only on success, so
/// an `Err` always means the map was left unchanged.
pub trait ConfigLoader: Send + Sync {
    /// Short label used in diagnostics
    fn name(&self) -> &'static str;

    fn load(&self, settings: &mut Settings) -> Result<(), ConfigError>;
}

/// Compiled-in defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsLoader;

impl ConfigLoader for DefaultsLoader {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn load(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        for (key, value) in DEFAULTS {
            settings.set(*key, *value);
        }
        Ok(())
    }
}

/// `.env`-format file; does not touch the process environment
#[derive(Debug, Clone)]
pub struct FileLoader {
    dir: PathBuf,
    file_name: String,
}

impl FileLoader {
    pub fn new(file_name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new(".env", ".")
    }
}

impl ConfigLoader for FileLoader {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        let path = self.path();
        let unavailable = |source| ConfigError::FileUnavailable {
            path: path.clone(),
            source,
        };

        let mut staged = Settings::default();
        for item in dotenvy::from_path_iter(&path).map_err(unavailable)? {
            let (key, value) = item.map_err(unavailable)?;
            staged.set(key, value);
        }

        settings.merge(staged);
        Ok(())
    }
}

/// Process environment, restricted to [`KNOWN_KEYS`]
///
/// Empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    // Fixed variable set instead of the live environment (tests).
    vars: Option<HashMap<String, String>>,
}

impl EnvLoader {
    /// Read from the live process environment
    pub fn new() -> Self {
        Self { vars: None }
    }

    /// Read from a fixed set of variables
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match &self.vars {
            Some(vars) => Ok(vars.get(key).cloned()),
            None => match std::env::var(key) {
                Ok(value) => Ok(Some(value)),
                Err(std::env::VarError::NotPresent) => Ok(None),
                Err(std::env::VarError::NotUnicode(_)) => {
                    Err(ConfigError::NotUnicode(key.to_string()))
                }
            },
        }
    }
}

impl ConfigLoader for EnvLoader {
    fn name(&self) -> &'static str {
        "env"
    }

    fn load(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        let mut staged = Settings::default();
        for key in KNOWN_KEYS {
            if let Some(value) = self.lookup(key)? {
                if !value.is_empty() {
                    staged.set(*key, value);
                }
            }
        }

        settings.merge(staged);
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Runs an ordered loader chain and produces a [`Config`]
#[derive(Default)]
pub struct ConfigBuilder {
    loaders: Vec<Box<dyn ConfigLoader>>,
}

impl ConfigBuilder {
    /// Empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// defaults → `./.env` → environment
    pub fn standard() -> Self {
        Self::new()
            .with_loader(DefaultsLoader)
            .with_loader(FileLoader::default())
            .with_loader(EnvLoader::new())
    }

    /// Append a loader; later loaders win
    pub fn with_loader(mut self, loader: impl ConfigLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Run every loader in order and convert the result
    ///
    /// Loader failures never abort the chain; they are recorded on the
    /// returned config (see [`Config::load_warnings`]) so the caller can log
    /// them once logging is up.
    pub fn build(&self) -> Config {
        let mut settings = Settings::default();
        let mut warnings = Vec::new();

        for loader in &self.loaders {
            if let Err(e) = loader.load(&mut settings) {
                warnings.push(format!("{} loader skipped: {}", loader.name(), e));
            }
        }

        let mut config = Config::from_settings(&settings);
        config.load_warnings.extend(warnings);
        config
    }
}

// ============================================================================
// Config snapshot
// ============================================================================

static GLOBAL: OnceLock<Config> = OnceLock::new();

/// Immutable configuration snapshot
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub service_name: String,
    pub version: String,
    pub base_url: String,
    pub port: u16,
    pub env: String,
    /// Raw `;`-separated allow-list, see [`Config::cors_origins`]
    pub allowed_origins: String,
    pub access_token_ttl: Duration,
    pub jwt_secret: Vec<u8>,
    pub db_host: String,
    pub db_port: String,
    pub db_user: String,
    pub db_name: String,
    pub db_pass: String,
    pub db_ssl_mode: String,
    pub sentry_dsn: Option<String>,
    load_warnings: Vec<String>,
}

impl Config {
    /// Process-wide snapshot built by [`ConfigBuilder::standard`]
    ///
    /// The loader chain runs exactly once; concurrent first callers wait for
    /// that single run and all receive the same snapshot.
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(|| ConfigBuilder::standard().build())
    }

    /// Convert a merged settings map
    pub fn from_settings(settings: &Settings) -> Self {
        let mut load_warnings = Vec::new();

        let ttl_days = match settings.get(ACCESS_TOKEN_TTL).map(str::trim) {
            None | Some("") => DEFAULT_ACCESS_TOKEN_TTL_DAYS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => DEFAULT_ACCESS_TOKEN_TTL_DAYS,
                Ok(days) if days <= MAX_ACCESS_TOKEN_TTL_DAYS => days,
                Ok(_) => {
                    load_warnings.push(format!(
                        "{ACCESS_TOKEN_TTL}={raw:?} exceeds {MAX_ACCESS_TOKEN_TTL_DAYS} days, using {DEFAULT_ACCESS_TOKEN_TTL_DAYS}"
                    ));
                    DEFAULT_ACCESS_TOKEN_TTL_DAYS
                }
                Err(_) => {
                    load_warnings.push(format!(
                        "{ACCESS_TOKEN_TTL}={raw:?} is not a number of days, using {DEFAULT_ACCESS_TOKEN_TTL_DAYS}"
                    ));
                    DEFAULT_ACCESS_TOKEN_TTL_DAYS
                }
            },
        };

        let port = match settings.get(PORT).map(str::trim) {
            None | Some("") => DEFAULT_PORT,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                load_warnings.push(format!("{PORT}={raw:?} is not a port, using {DEFAULT_PORT}"));
                DEFAULT_PORT
            }),
        };

        Self {
            service_name: settings.string(SERVICE_NAME),
            version: settings.string(VERSION),
            base_url: settings.string(BASE_URL),
            port,
            env: settings.string(ENV),
            allowed_origins: settings.string(ALLOWED_ORIGINS),
            access_token_ttl: Duration::from_secs(ttl_days * SECS_PER_DAY),
            jwt_secret: settings.string(JWT_SECRET).into_bytes(),
            db_host: settings.string(DB_HOST),
            db_port: settings.string(DB_PORT),
            db_user: settings.string(DB_USER),
            db_name: settings.string(DB_NAME),
            db_pass: settings.string(DB_PASS),
            db_ssl_mode: settings.string(DB_SSL_MODE),
            sentry_dsn: settings
                .get(SENTRY_DSN)
                .map(str::trim)
                .filter(|dsn| !dsn.is_empty())
                .map(str::to_string),
            load_warnings,
        }
    }

    /// Parsed CORS allow-list: split on `;`, blank entries dropped
    pub fn cors_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(';')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Postgres connection URL
    pub fn database_url(&self) -> String {
        let mut url = format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_user, self.db_pass, self.db_host, self.db_port, self.db_name
        );
        if !self.db_ssl_mode.is_empty() {
            url.push_str("?sslmode=");
            url.push_str(&self.db_ssl_mode);
        }
        url
    }

    /// Grace period for in-flight requests on shutdown
    pub fn shutdown_timeout(&self) -> Duration {
        SHUTDOWN_TIMEOUT
    }

    pub fn is_production(&self) -> bool {
        self.env == ENV_PROD
    }

    /// Non-fatal problems met while loading (skipped sources, bad values)
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    /// Config from defaults only; handy for tests and tooling
    pub fn defaults() -> Self {
        ConfigBuilder::new().with_loader(DefaultsLoader).build()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("service_name", &self.service_name)
            .field("version", &self.version)
            .field("base_url", &self.base_url)
            .field("port", &self.port)
            .field("env", &self.env)
            .field("allowed_origins", &self.allowed_origins)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("jwt_secret", &"[REDACTED]")
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field("db_name", &self.db_name)
            .field("db_pass", &"[REDACTED]")
            .field("db_ssl_mode", &self.db_ssl_mode)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
