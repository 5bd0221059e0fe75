//! Configuration loading for the SUKL search proxy.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/sukl-search/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Retry policy for calls to the search backend.
///
/// `backoff_ms` holds the sleeps between attempts, so it must contain exactly
/// `max_attempts - 1` entries.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts per logical call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Sleep before attempt 2, 3, ... in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> Vec<u64> {
    vec![1_000, 3_000]
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetrySettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        let expected = (self.max_attempts - 1) as usize;
        if self.backoff_ms.len() != expected {
            return Err(ConfigError::Invalid {
                key: "retry.backoff_ms",
                reason: format!(
                    "expected {} entries for {} attempts, got {}",
                    expected,
                    self.max_attempts,
                    self.backoff_ms.len()
                ),
            });
        }
        Ok(())
    }

    /// Backoff schedule as durations.
    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

/// Where bearer tokens for the search service come from.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Platform managed identity (default)
    #[default]
    ManagedIdentity,
    /// A fixed bearer token from configuration
    Static,
}

/// Credential source settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub mode: AuthMode,

    /// Identity endpoint override (falls back to IDENTITY_ENDPOINT, then IMDS)
    #[serde(default)]
    pub identity_endpoint: Option<String>,

    /// Identity header override (falls back to IDENTITY_HEADER)
    #[serde(default)]
    pub identity_header: Option<SecretString>,

    /// Client ID of a user-assigned identity
    #[serde(default)]
    pub client_id: Option<String>,

    /// Bearer token used when `mode = "static"`
    #[serde(default)]
    pub static_token: Option<SecretString>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable output
    Pretty,
}

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL of the search service (e.g. https://example.search.windows.net)
    #[serde(default)]
    pub search_endpoint: Option<String>,

    /// REST API version sent with every call
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub auth: AuthSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_api_version() -> String {
    "2024-07-01".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_endpoint: None,
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetrySettings::default(),
            auth: AuthSettings::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/sukl-search/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SUKL_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "sukl-search")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("api_version", default_api_version())?
            .set_default("request_timeout_secs", default_request_timeout_secs() as i64)?
            .set_default("log_level", default_log_level())?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SUKL_SEARCH_ENDPOINT, SUKL_RETRY__MAX_ATTEMPTS, SUKL_AUTH__MODE, ...
        builder = builder.add_source(
            Environment::with_prefix("SUKL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("retry.backoff_ms"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.retry.validate()?;
        Ok(settings)
    }

    /// The configured search endpoint without a trailing slash.
    pub fn endpoint(&self) -> Result<&str, ConfigError> {
        self.search_endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::Missing("search_endpoint"))
    }

    /// Per-attempt timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
