//! Configuration module for bucketsync.
//!
//! The configuration source is a flat `key = value` text file:
//!
//! ```text
//! # mirror photos into s3://my-bucket/photos
//! local_dir = /srv/photos
//! bucket_name = my-bucket
//! prefix = photos
//! sync_interval = 15m
//! marker_policy = per_subdirectory
//! ```
//!
//! Loading parses the file, converts each known key into a typed field,
//! and validates the result. A [`ConfigBuilder`] builds configurations
//! programmatically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::domain::{
    DomainError, KeyPrefix, MarkerFileName, MarkerPolicy, ReconcileMode, SyncPolicy, SyncTarget,
    DEFAULT_MARKER_FILE,
};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const MAX_RETRIES_LIMIT: u32 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Valid values for `log_level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Every key the loader understands.
const KNOWN_KEYS: &[&str] = &[
    "local_dir",
    "bucket_name",
    "aws_access_key",
    "aws_secret_key",
    "aws_region",
    "endpoint_url",
    "force_path_style",
    "prefix",
    "sync_marker_file",
    "sync_interval",
    "marker_policy",
    "reconcile",
    "operation_timeout",
    "max_retries",
    "log_level",
];

// ---------------------------------------------------------------------------
// Config struct
// ---------------------------------------------------------------------------

/// Top-level configuration for bucketsync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the local tree to mirror.
    pub local_dir: PathBuf,
    /// Destination bucket.
    pub bucket_name: String,
    /// Store connection settings.
    pub store: StoreConfig,
    /// Key prefix, without leading or trailing slashes.
    pub prefix: String,
    /// Filename of the per-subdirectory completion marker.
    pub sync_marker_file: String,
    /// Time between passes. `None` runs a single pass.
    pub sync_interval: Option<Duration>,
    /// Marker gating policy.
    pub marker_policy: MarkerPolicy,
    /// Delete remote objects that have no local counterpart.
    pub reconcile: bool,
    /// Deadline for each remote operation.
    pub operation_timeout: Duration,
    /// Retries of transient remote failures.
    pub max_retries: u32,
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub log_level: String,
}

/// Object store connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Static access key. Both keys or neither must be set.
    pub access_key: Option<String>,
    /// Static secret key.
    pub secret_key: Option<String>,
    pub region: String,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
    /// Use path-style bucket addressing.
    pub force_path_style: bool,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

impl StoreConfig {
    /// Static credentials, if both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(ak), Some(sk)) => Some((ak.as_str(), sk.as_str())),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::new(),
            bucket_name: String::new(),
            store: StoreConfig::default(),
            prefix: String::new(),
            sync_marker_file: DEFAULT_MARKER_FILE.to_string(),
            sync_interval: None,
            marker_policy: MarkerPolicy::default(),
            reconcile: false,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the offending key, e.g. `"sync_marker_file"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised while loading configuration. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config line {line}: expected 'key = value', got '{content}'")]
    Malformed { line: usize, content: String },

    #[error("Unknown config key '{key}' on line {line}")]
    UnknownKey { line: usize, key: String },

    #[error("Missing required config key '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value '{value}' for '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("Invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load and validate configuration from the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let pairs = parse_pairs(content)?;
        let config = Self::from_pairs(pairs)?;

        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    fn from_pairs(mut pairs: BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Config {
            local_dir: PathBuf::from(require(&mut pairs, "local_dir")?),
            bucket_name: require(&mut pairs, "bucket_name")?,
            ..Config::default()
        };

        config.store.access_key = pairs.remove("aws_access_key").filter(|v| !v.is_empty());
        config.store.secret_key = pairs.remove("aws_secret_key").filter(|v| !v.is_empty());
        if let Some(region) = pairs.remove("aws_region") {
            config.store.region = region;
        }
        config.store.endpoint_url = pairs.remove("endpoint_url").filter(|v| !v.is_empty());
        if let Some(value) = pairs.remove("force_path_style") {
            config.store.force_path_style = parse_bool("force_path_style", &value)?;
        }

        if let Some(prefix) = pairs.remove("prefix") {
            config.prefix = prefix.trim_matches('/').to_string();
        }
        if let Some(marker) = pairs.remove("sync_marker_file") {
            config.sync_marker_file = marker;
        }
        if let Some(value) = pairs.remove("sync_interval") {
            let interval = parse_duration("sync_interval", &value)?;
            config.sync_interval = Some(interval).filter(|d| !d.is_zero());
        }
        if let Some(value) = pairs.remove("marker_policy") {
            config.marker_policy = value.parse().map_err(|e: DomainError| {
                ConfigError::InvalidValue {
                    key: "marker_policy".into(),
                    value: value.clone(),
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(value) = pairs.remove("reconcile") {
            config.reconcile = parse_bool("reconcile", &value)?;
        }
        if let Some(value) = pairs.remove("operation_timeout") {
            config.operation_timeout = parse_duration("operation_timeout", &value)?;
        }
        if let Some(value) = pairs.remove("max_retries") {
            config.max_retries = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "max_retries".into(),
                value: value.clone(),
                message: "expected a non-negative integer".into(),
            })?;
        }
        if let Some(level) = pairs.remove("log_level") {
            config.log_level = level.to_ascii_lowercase();
        }

        Ok(config)
    }

    /// Derive the immutable [`SyncTarget`] for the engine.
    pub fn sync_target(&self) -> Result<SyncTarget, DomainError> {
        let target = SyncTarget::new(
            self.local_dir.clone(),
            self.bucket_name.clone(),
            KeyPrefix::new(&self.prefix)?,
        )?;
        Ok(target
            .with_marker(MarkerFileName::new(self.sync_marker_file.clone())?)
            .with_policy(SyncPolicy {
                markers: self.marker_policy,
                reconcile: ReconcileMode::from(self.reconcile),
            }))
    }

    /// Returns true when no interval is configured.
    pub fn is_one_shot(&self) -> bool {
        self.sync_interval.is_none()
    }
}

/// Split text into trimmed key/value pairs. Later keys override earlier ones.
fn parse_pairs(content: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut pairs = BTreeMap::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            });
        }
        if !KNOWN_KEYS.contains(&key) {
            return Err(ConfigError::UnknownKey {
                line: idx + 1,
                key: key.to_string(),
            });
        }

        pairs.insert(key.to_string(), value.trim().to_string());
    }

    Ok(pairs)
}

fn require(pairs: &mut BTreeMap<String, String>, key: &'static str) -> Result<String, ConfigError> {
    pairs
        .remove(key)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingField(key))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: "expected true or false".into(),
        }),
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    if value == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        if self.local_dir.as_os_str().is_empty() {
            push("local_dir", "must not be empty".into());
        }
        if self.bucket_name.trim().is_empty() {
            push("bucket_name", "must not be empty".into());
        }

        match (&self.store.access_key, &self.store.secret_key) {
            (Some(_), None) => push(
                "aws_secret_key",
                "must be set when aws_access_key is set".into(),
            ),
            (None, Some(_)) => push(
                "aws_access_key",
                "must be set when aws_secret_key is set".into(),
            ),
            _ => {}
        }
        if self.store.region.trim().is_empty() {
            push("aws_region", "must not be empty".into());
        }
        if let Some(url) = &self.store.endpoint_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                push(
                    "endpoint_url",
                    format!("must start with http:// or https://, got '{url}'"),
                );
            }
        }

        if let Err(e) = KeyPrefix::new(&self.prefix) {
            push("prefix", e.to_string());
        }
        if let Err(e) = MarkerFileName::new(self.sync_marker_file.clone()) {
            push("sync_marker_file", e.to_string());
        }

        if self.operation_timeout.is_zero() {
            push("operation_timeout", "must be greater than 0".into());
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            push(
                "max_retries",
                format!("must be at most {MAX_RETRIES_LIMIT}, got {}", self.max_retries),
            );
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            push(
                "log_level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.log_level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder for the two required fields.
    pub fn new(local_dir: impl Into<PathBuf>, bucket_name: impl Into<String>) -> Self {
        Self {
            config: Config {
                local_dir: local_dir.into(),
                bucket_name: bucket_name.into(),
                ..Config::default()
            },
        }
    }

    pub fn credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.config.store.access_key = Some(access_key.into());
        self.config.store.secret_key = Some(secret_key.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.store.region = region.into();
        self
    }

    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.store.endpoint_url = Some(url.into());
        self
    }

    pub fn force_path_style(mut self, enabled: bool) -> Self {
        self.config.store.force_path_style = enabled;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn sync_marker_file(mut self, name: impl Into<String>) -> Self {
        self.config.sync_marker_file = name.into();
        self
    }

    /// A zero interval means one-shot.
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval = Some(interval).filter(|d| !d.is_zero());
        self
    }

    pub fn marker_policy(mut self, policy: MarkerPolicy) -> Self {
        self.config.marker_policy = policy;
        self
    }

    pub fn reconcile(mut self, enabled: bool) -> Self {
        self.config.reconcile = enabled;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
