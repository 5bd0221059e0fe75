//! Search error types.

use thiserror::Error;

/// Errors that can occur while translating, executing or shaping a search.
///
/// A missing document is not an error: single-key lookups return
/// [`Lookup::NotFound`](crate::Lookup::NotFound) instead.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Credential acquisition failed. Never retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The backend rejected the call or retries were exhausted.
    ///
    /// `detail` is for internal logs only and is left out of `Display`.
    #[error("Search backend failed with status {status}")]
    Upstream { status: u16, detail: String },

    /// Domain parameters rejected before any call was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A 200 response whose body was not valid JSON
    #[error("Failed to decode search response: {0}")]
    Decode(String),

    /// Client construction or settings problem
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SearchError {
    /// Build an upstream failure.
    pub fn upstream(status: u16, detail: impl Into<String>) -> Self {
        SearchError::Upstream {
            status,
            detail: detail.into(),
        }
    }

    /// HTTP status carried by an upstream failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            SearchError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Internal-only detail of an upstream failure.
    pub fn detail(&self) -> Option<&str> {
        match self {
            SearchError::Upstream { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// True for failures of the remote service (as opposed to local ones).
    pub fn is_upstream(&self) -> bool {
        matches!(self, SearchError::Upstream { .. })
    }
}

impl From<sukl_types::ConfigError> for SearchError {
    fn from(e: sukl_types::ConfigError) -> Self {
        SearchError::Config(e.to_string())
    }
}
