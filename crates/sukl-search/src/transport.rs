//! HTTP transport to the search backend with retry.
//!
//! One [`SearchTransport`] (and its connection pool) is shared by all
//! concurrent requests; the retry state of a call lives on that call's
//! stack. Dropping the returned future aborts the in-flight attempt or the
//! pending backoff sleep, and no further attempts are made.

use std::sync::Arc;
use std::time::{Duration, Instant};

use backoff::backoff::Backoff;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use sukl_types::Settings;

use crate::auth::{AccessToken, TokenProvider};
use crate::error::SearchError;
use crate::query::SearchQuery;
use crate::retry::{is_retryable, RetryPolicy, NETWORK_ERROR_STATUS, TIMEOUT_STATUS};

/// Name reported as `api` in call events.
pub const API_NAME: &str = "AzureSearch";

/// REST API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-07-01";

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a single-key lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }
}

/// One logical call, possibly sent several times.
struct Call<'a> {
    method: Method,
    path: String,
    select: Option<String>,
    body: Option<&'a Value>,
    context: String,
    not_found_is_sentinel: bool,
}

/// Client for the search REST API.
pub struct SearchTransport {
    client: Client,
    endpoint: String,
    api_version: String,
    tokens: Arc<dyn TokenProvider>,
    policy: RetryPolicy,
}

impl SearchTransport {
    /// Create a transport with the default API version and retry policy.
    pub fn new(client: Client, endpoint: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            tokens,
            policy: RetryPolicy::default(),
        }
    }

    /// Build the shared HTTP client with a per-attempt timeout.
    pub fn http_client(timeout: Duration) -> Result<Client, SearchError> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))
    }

    /// Create a transport from loaded settings.
    pub fn from_settings(
        client: Client,
        settings: &Settings,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, SearchError> {
        let policy = RetryPolicy::from_settings(&settings.retry)?;
        Ok(Self::new(client, settings.endpoint()?, tokens)
            .with_api_version(settings.api_version.clone())
            .with_policy(policy))
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// `POST /indexes/{index}/docs/search` and return the decoded body.
    pub async fn search(&self, index: &str, query: &SearchQuery) -> Result<Value, SearchError> {
        let body = serde_json::to_value(query.body())
            .map_err(|e| SearchError::Config(format!("unserializable query: {}", e)))?;

        let kind = if query.is_hybrid() { "hybrid" } else { "search" };
        let call = Call {
            method: Method::POST,
            path: format!("/indexes/{}/docs/search", index),
            select: None,
            body: Some(&body),
            context: format!("{}:{}", kind, index),
            not_found_is_sentinel: false,
        };

        match self.execute(&call).await? {
            Lookup::Found(value) => Ok(value),
            Lookup::NotFound => Err(SearchError::upstream(
                StatusCode::NOT_FOUND.as_u16(),
                "index not found",
            )),
        }
    }

    /// `GET /indexes/{index}/docs('{key}')`; a 404 is [`Lookup::NotFound`].
    pub async fn get_document(
        &self,
        index: &str,
        key: &str,
        select: &[&str],
    ) -> Result<Lookup<Value>, SearchError> {
        let call = Call {
            method: Method::GET,
            path: format!("/indexes/{}/docs('{}')", index, key.replace('\'', "''")),
            select: (!select.is_empty()).then(|| select.join(",")),
            body: None,
            context: format!("doc:{}/{}", index, key),
            not_found_is_sentinel: true,
        };

        self.execute(&call).await
    }

    /// Run the retry loop for one logical call.
    async fn execute(&self, call: &Call<'_>) -> Result<Lookup<Value>, SearchError> {
        // Auth failures surface here, outside the retry loop.
        let token = self.tokens.token().await?;

        let max_attempts = self.policy.max_attempts();
        let mut schedule = self.policy.schedule();
        let mut last_error: Option<SearchError> = None;

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            let result = self.send(call, &token).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok((status, body)) => {
                    log_attempt(call, status.as_u16(), duration_ms, attempt);

                    if status == StatusCode::OK {
                        return decode(&body).map(Lookup::Found);
                    }
                    if status == StatusCode::NOT_FOUND && call.not_found_is_sentinel {
                        return Ok(Lookup::NotFound);
                    }

                    let detail = String::from_utf8_lossy(&body).into_owned();
                    if !is_retryable(status.as_u16()) {
                        return Err(SearchError::upstream(status.as_u16(), detail));
                    }

                    warn!(
                        status = status.as_u16(),
                        attempt,
                        context = %call.context,
                        "upstream_retry"
                    );
                    last_error = Some(SearchError::upstream(status.as_u16(), detail));
                }
                Err(e) if e.is_timeout() => {
                    log_attempt(call, TIMEOUT_STATUS, duration_ms, attempt);
                    warn!(attempt, context = %call.context, "upstream_timeout");
                    last_error = Some(SearchError::upstream(TIMEOUT_STATUS, "Request timeout"));
                }
                Err(e) => {
                    log_attempt(call, NETWORK_ERROR_STATUS, duration_ms, attempt);
                    warn!(
                        error = %e,
                        attempt,
                        context = %call.context,
                        "upstream_network_error"
                    );
                    last_error = Some(SearchError::upstream(NETWORK_ERROR_STATUS, e.to_string()));
                }
            }

            if attempt < max_attempts {
                if let Some(delay) = schedule.next_backoff() {
                    debug!(delay_ms = delay.as_millis() as u64, attempt, "upstream_backoff");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SearchError::upstream(500, "All retries exhausted")))
    }

    /// Send one attempt and read the full body.
    async fn send(
        &self,
        call: &Call<'_>,
        token: &AccessToken,
    ) -> Result<(StatusCode, Vec<u8>), reqwest::Error> {
        let url = format!("{}{}", self.endpoint, call.path);

        let mut request = self
            .client
            .request(call.method.clone(), &url)
            .header(AUTHORIZATION, token.bearer())
            .query(&[("api-version", self.api_version.as_str())]);

        if let Some(select) = &call.select {
            request = request.query(&[("$select", select.as_str())]);
        }
        if let Some(body) = call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }
}

impl std::fmt::Debug for SearchTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTransport")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("policy", &self.policy)
            .finish()
    }
}

fn log_attempt(call: &Call<'_>, status: u16, duration_ms: u64, attempt: u32) {
    info!(
        api = API_NAME,
        method = %call.method,
        path = %call.path,
        status,
        duration_ms,
        attempt,
        "upstream_call"
    );
}

fn decode(body: &[u8]) -> Result<Value, SearchError> {
    serde_json::from_slice(body).map_err(|e| SearchError::Decode(e.to_string()))
}
