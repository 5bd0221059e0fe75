//! Bearer credentials for the search service.
//!
//! A token is acquired before every logical call and never cached; each
//! concurrent call performs its own acquisition. Failures are
//! [`SearchError::Auth`] and bypass the transport retry policy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use sukl_types::{AuthMode, AuthSettings};

use crate::error::SearchError;

/// Audience of tokens issued for the search service.
pub const SEARCH_RESOURCE: &str = "https://search.azure.com";

/// Instance metadata identity endpoint, used when no platform endpoint is set.
pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// An opaque bearer credential with an optional expiry.
#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: SecretString, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { secret, expires_at }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret.expose_secret())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens.
///
/// Implementations must tolerate concurrent calls; no locking is added
/// around them.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a token for one outbound logical call.
    async fn token(&self) -> Result<AccessToken, SearchError>;
}

/// Fixed bearer token from configuration.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<AccessToken, SearchError> {
        if self.token.expose_secret().is_empty() {
            return Err(SearchError::Auth("static token is empty".to_string()));
        }
        Ok(AccessToken::new(self.token.clone(), None))
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Token issued by the hosting platform's managed identity endpoint.
///
/// With an identity header the App Service / Container Apps protocol is used
/// (`X-IDENTITY-HEADER`), otherwise the instance metadata protocol
/// (`Metadata: true`).
pub struct ManagedIdentityCredential {
    client: Client,
    endpoint: String,
    identity_header: Option<SecretString>,
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_on: Option<Value>,
}

impl ManagedIdentityCredential {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        identity_header: Option<SecretString>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            identity_header,
            client_id,
        }
    }

    /// Resolve the endpoint from settings, then `IDENTITY_ENDPOINT` /
    /// `IDENTITY_HEADER`, then the instance metadata endpoint.
    pub fn from_settings(client: Client, auth: &AuthSettings) -> Self {
        let endpoint = auth
            .identity_endpoint
            .clone()
            .or_else(|| std::env::var("IDENTITY_ENDPOINT").ok())
            .filter(|e| !e.is_empty());

        let (endpoint, identity_header) = match endpoint {
            Some(endpoint) => {
                let header = auth
                    .identity_header
                    .clone()
                    .or_else(|| std::env::var("IDENTITY_HEADER").ok().map(SecretString::from));
                (endpoint, header)
            }
            None => (IMDS_ENDPOINT.to_string(), None),
        };

        Self::new(client, endpoint, identity_header, auth.client_id.clone())
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityCredential {
    async fn token(&self) -> Result<AccessToken, SearchError> {
        let api_version = if self.identity_header.is_some() {
            APP_SERVICE_API_VERSION
        } else {
            IMDS_API_VERSION
        };

        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("resource", SEARCH_RESOURCE), ("api-version", api_version)]);

        if let Some(client_id) = &self.client_id {
            request = request.query(&[("client_id", client_id.as_str())]);
        }

        request = match &self.identity_header {
            Some(header) => request.header("X-IDENTITY-HEADER", header.expose_secret()),
            None => request.header("Metadata", "true"),
        };

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Auth(format!("identity endpoint unreachable: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SearchError::Auth(format!(
                "identity endpoint returned {}",
                status
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Auth(format!("invalid token response: {}", e)))?;

        if body.access_token.is_empty() {
            return Err(SearchError::Auth(
                "token response has no access_token".to_string(),
            ));
        }

        let expires_at = body.expires_on.as_ref().and_then(parse_expires_on);
        debug!(expires_at = ?expires_at, "token_acquired");

        Ok(AccessToken::new(
            SecretString::from(body.access_token),
            expires_at,
        ))
    }
}

impl std::fmt::Debug for ManagedIdentityCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedIdentityCredential")
            .field("endpoint", &self.endpoint)
            .field("identity_header", &self.identity_header.as_ref().map(|_| "[REDACTED]"))
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// `expires_on` is epoch seconds, sent as a string or a number.
fn parse_expires_on(value: &Value) -> Option<DateTime<Utc>> {
    let seconds = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(seconds, 0)
}

/// Build the configured credential source.
pub fn provider_from_settings(
    client: Client,
    auth: &AuthSettings,
) -> Result<Arc<dyn TokenProvider>, SearchError> {
    match auth.mode {
        AuthMode::ManagedIdentity => Ok(Arc::new(ManagedIdentityCredential::from_settings(
            client, auth,
        ))),
        AuthMode::Static => {
            let token = auth.static_token.clone().ok_or_else(|| {
                SearchError::Config("auth.static_token is required in static mode".to_string())
            })?;
            Ok(Arc::new(StaticTokenProvider::new(token)))
        }
    }
}
