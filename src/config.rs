//! Configuration management for athena-query.
//!
//! Handles loading the service configuration from TOML files and environment
//! variables, and resolves the defaults the service expects (workgroup,
//! endpoint, poll timing).

use crate::error::{AthenaError, Result};
use crate::query::PollPolicy;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Workgroup used when none is configured.
pub const DEFAULT_WORKGROUP: &str = "primary";

/// Default timeout for a single HTTP call to the service.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// What `run_query` does with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Return the error to the caller.
    #[default]
    Propagate,
    /// Log the error and resolve with no rows.
    LogAndSwallow,
}

/// Poll timing as it appears in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    /// Wait after observing QUEUED, in milliseconds.
    #[serde(default = "default_queued_interval_ms")]
    pub queued_interval_ms: u64,

    /// Wait after observing RUNNING, in milliseconds.
    #[serde(default = "default_running_interval_ms")]
    pub running_interval_ms: u64,

    /// Overall limit on waiting for one execution, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Maximum number of status checks for one execution.
    #[serde(default)]
    pub max_polls: Option<u32>,
}

fn default_queued_interval_ms() -> u64 {
    50
}

fn default_running_interval_ms() -> u64 {
    10
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            queued_interval_ms: default_queued_interval_ms(),
            running_interval_ms: default_running_interval_ms(),
            timeout_secs: None,
            max_polls: None,
        }
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        PollPolicy {
            queued_interval: Duration::from_millis(config.queued_interval_ms),
            running_interval: Duration::from_millis(config.running_interval_ms),
            timeout: config.timeout_secs.map(Duration::from_secs),
            max_polls: config.max_polls,
        }
    }
}

/// Connection and execution settings for the query service.
///
/// Immutable once handed to a [`crate::QueryService`].
#[derive(Clone, Deserialize)]
pub struct ServiceConfig {
    /// AWS region, e.g. `us-east-1`.
    #[serde(default)]
    pub region: String,

    /// Access key id.
    #[serde(default)]
    pub access_key_id: String,

    /// Secret access key (not recommended to store in config).
    #[serde(default)]
    pub secret_access_key: String,

    /// Database queries run against.
    #[serde(default)]
    pub database: String,

    /// Workgroup queries run under; empty means `primary` unless
    /// `ATHENA_WORKGROUP` is set.
    #[serde(default)]
    pub workgroup: String,

    /// Data catalog; the service default applies when absent.
    #[serde(default)]
    pub catalog: Option<String>,

    /// Result location, e.g. `s3://bucket/prefix/`; the workgroup setting applies when absent.
    #[serde(default)]
    pub output_location: Option<String>,

    /// Endpoint override; derived from the region when absent.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Failure handling for `run_query`.
    #[serde(default)]
    pub error_mode: ErrorMode,

    /// Poll timing.
    #[serde(default)]
    pub poll: PollConfig,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            database: String::new(),
            workgroup: String::new(),
            catalog: None,
            output_location: None,
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
            error_mode: ErrorMode::default(),
            poll: PollConfig::default(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("database", &self.database)
            .field("workgroup", &self.workgroup)
            .field("catalog", &self.catalog)
            .field("output_location", &self.output_location)
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("error_mode", &self.error_mode)
            .field("poll", &self.poll)
            .finish()
    }
}

impl ServiceConfig {
    /// Creates a config for the given region and database with every other field defaulted.
    pub fn new(region: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Sets the credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.secret_access_key = secret_access_key.into();
        self
    }

    /// Sets the workgroup.
    pub fn with_workgroup(mut self, workgroup: impl Into<String>) -> Self {
        self.workgroup = workgroup.into();
        self
    }

    /// Sets the data catalog.
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Sets the result output location.
    pub fn with_output_location(mut self, location: impl Into<String>) -> Self {
        self.output_location = Some(location.into());
        self
    }

    /// Sets the endpoint override.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets how `run_query` handles failures.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Sets the poll timing.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Returns the configured workgroup, falling back to `primary` when blank.
    pub fn effective_workgroup(&self) -> &str {
        let workgroup = self.workgroup.trim();
        if workgroup.is_empty() {
            DEFAULT_WORKGROUP
        } else {
            workgroup
        }
    }

    /// Returns the poll policy described by this config.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.poll)
    }

    /// Resolves the service endpoint URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://athena.{}.amazonaws.com/", self.region),
        };

        let url = Url::parse(&raw)
            .map_err(|e| AthenaError::config(format!("Invalid endpoint '{raw}': {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AthenaError::config(format!(
                "Invalid endpoint scheme '{}'. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        Ok(url)
    }

    /// Checks that the fields every execution needs are present.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(AthenaError::config("region is required"));
        }
        if self.database.trim().is_empty() {
            return Err(AthenaError::config("database is required"));
        }
        if self.poll.queued_interval_ms == 0 && self.poll.running_interval_ms == 0 {
            tracing::warn!("Both poll intervals are zero; status checks will not back off");
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// Applies environment variables (AWS_REGION, ATHENA_DATABASE, etc.) to unset fields.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|name| std::env::var(name).ok());
    }

    fn apply_defaults_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if self.region.is_empty() {
            if let Some(region) = env("AWS_REGION").or_else(|| env("AWS_DEFAULT_REGION")) {
                self.region = region;
            }
        }
        if self.access_key_id.is_empty() {
            if let Some(key) = env("AWS_ACCESS_KEY_ID") {
                self.access_key_id = key;
            }
        }
        if self.secret_access_key.is_empty() {
            if let Some(secret) = env("AWS_SECRET_ACCESS_KEY") {
                self.secret_access_key = secret;
            }
        }
        if self.database.is_empty() {
            if let Some(database) = env("ATHENA_DATABASE") {
                self.database = database;
            }
        }
        if self.workgroup.trim().is_empty() {
            if let Some(workgroup) = env("ATHENA_WORKGROUP") {
                self.workgroup = workgroup;
            }
        }
        if self.catalog.is_none() {
            self.catalog = env("ATHENA_CATALOG");
        }
        if self.output_location.is_none() {
            self.output_location = env("ATHENA_OUTPUT_LOCATION");
        }
        if self.endpoint.is_none() {
            self.endpoint = env("ATHENA_ENDPOINT");
        }
    }

    /// Builds a config purely from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athena-query")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults; environment variables fill any
    /// field the file leaves unset.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| AthenaError::config(format!("Failed to read config file: {e}")))?;
            Self::parse_toml(&content, path)?
        } else {
            Self::default()
        };

        config.apply_env_defaults();
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            AthenaError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Returns a display-safe string (no credentials) for log output.
    pub fn display_string(&self) -> String {
        let catalog = self.catalog.as_deref().unwrap_or("default");
        format!(
            "{}.{} @ {} (workgroup {})",
            catalog,
            self.database,
            self.region,
            self.effective_workgroup()
        )
    }
}
