//! Error types for configuration loading.

use thiserror::Error;

/// Errors raised while loading or validating [`Settings`](crate::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The layered sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Load(String),

    /// A required key has no value in any source
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A value is present but out of range
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e.to_string())
    }
}
