//! HTTP client with pacing and outcome classification
//!
//! The client performs exactly one attempt per call and reports what
//! happened as a [`FetchResult`]:
//! - 2xx with a JSON body becomes `Success`
//! - 403/429 become `RateLimited`, carrying any `Retry-After` hint
//! - timeouts, connection failures, 408 and 5xx become `TransientFailure`
//! - everything else (auth, not found, malformed body) becomes `FatalFailure`
//!
//! Retrying is left to the caller; see [`crate::retry`].

use super::rate_limit::{Pacer, PacerConfig};
use crate::error::{Error, Result};
use crate::types::Method;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Maximum number of body characters kept in a failure cause
const CAUSE_BODY_LIMIT: usize = 200;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Default request timeout
    pub timeout: Duration,
    /// Pacing between requests; `None` disables it
    pub pacing: Option<PacerConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            pacing: Some(PacerConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("gridload/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set request pacing
    pub fn pacing(mut self, config: PacerConfig) -> Self {
        self.config.pacing = Some(config);
        self
    }

    /// Disable request pacing
    pub fn no_pacing(mut self) -> Self {
        self.config.pacing = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

// ============================================================================
// Requests
// ============================================================================

/// A single request to send
#[derive(Clone, Default)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Request headers; values are never logged
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            ..Self::default()
        }
    }

    /// Create a POST request with a JSON body
    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
            ..Self::default()
        }
    }

    /// Create a GraphQL POST request
    pub fn graphql(url: impl Into<String>, query: &str, variables: Value) -> Self {
        Self::post_json(
            url,
            serde_json::json!({ "query": query, "variables": variables }),
        )
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        f.debug_struct("FetchRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("headers", &header_names)
            .field("has_body", &self.body.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Classified outcome of one fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T = Value> {
    Success { status: u16, body: T },
    RateLimited { retry_after: Option<Duration> },
    TransientFailure { cause: String },
    FatalFailure { cause: String },
}

impl<T> FetchResult<T> {
    pub fn fatal(cause: impl Into<String>) -> Self {
        Self::FatalFailure {
            cause: cause.into(),
        }
    }

    pub fn transient(cause: impl Into<String>) -> Self {
        Self::TransientFailure {
            cause: cause.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether a later attempt of the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::TransientFailure { .. })
    }

    /// Transform a successful body, leaving failures untouched
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchResult<U> {
        self.and_then(|status, body| FetchResult::Success {
            status,
            body: f(body),
        })
    }

    /// Chain a further classification step onto a successful body
    pub fn and_then<U>(self, f: impl FnOnce(u16, T) -> FetchResult<U>) -> FetchResult<U> {
        match self {
            Self::Success { status, body } => f(status, body),
            Self::RateLimited { retry_after } => FetchResult::RateLimited { retry_after },
            Self::TransientFailure { cause } => FetchResult::TransientFailure { cause },
            Self::FatalFailure { cause } => FetchResult::FatalFailure { cause },
        }
    }

    /// Convert into a plain `Result`, mapping each failure to its error variant
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Success { body, .. } => Ok(body),
            Self::RateLimited { retry_after } => Err(Error::RateLimited {
                retry_after_seconds: retry_after.map(|d| d.as_secs()),
            }),
            Self::TransientFailure { cause } => Err(Error::Transient { cause }),
            Self::FatalFailure { cause } => Err(Error::Fatal { cause }),
        }
    }
}

/// How a status code is treated before the body is looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    RateLimited,
    Transient,
    Fatal,
}

/// Classify an HTTP status code
pub fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        200..=299 => StatusClass::Success,
        403 | 429 => StatusClass::RateLimited,
        408 | 500..=599 => StatusClass::Transient,
        _ => StatusClass::Fatal,
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client that paces and classifies requests
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    pacer: Option<Pacer>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let pacer = config.pacing.as_ref().map(Pacer::new);

        Ok(Self {
            client,
            config,
            pacer,
        })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Check if pacing is enabled
    pub fn has_pacer(&self) -> bool {
        self.pacer.is_some()
    }

    /// Send one attempt of `request` and classify the outcome
    pub async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        if let Some(ref pacer) = self.pacer {
            pacer.wait().await;
        }

        let mut req = self
            .client
            .request(request.method.into(), &request.url)
            .timeout(request.timeout.unwrap_or(self.config.timeout));

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => return classify_send_error(&e),
        };

        let status = response.status();
        debug!("{:?} {} -> {}", request.method, request.url, status.as_u16());

        match classify_status(status) {
            StatusClass::Success => read_json_body(response, status).await,
            StatusClass::RateLimited => FetchResult::RateLimited {
                retry_after: extract_retry_after(&response),
            },
            StatusClass::Transient => {
                let body = response.text().await.unwrap_or_default();
                FetchResult::transient(format!("HTTP {}: {}", status.as_u16(), truncate(&body)))
            }
            StatusClass::Fatal => {
                let body = response.text().await.unwrap_or_default();
                FetchResult::fatal(format!("HTTP {}: {}", status.as_u16(), truncate(&body)))
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self
            .config
            .default_headers
            .keys()
            .map(String::as_str)
            .collect();
        f.debug_struct("HttpClient")
            .field("timeout", &self.config.timeout)
            .field("default_headers", &header_names)
            .field("has_pacer", &self.pacer.is_some())
            .finish_non_exhaustive()
    }
}

async fn read_json_body(response: Response, status: StatusCode) -> FetchResult {
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) if e.is_timeout() => {
            return FetchResult::transient(format!("timed out reading body: {e}"))
        }
        Err(e) => return FetchResult::transient(format!("failed reading body: {e}")),
    };

    match serde_json::from_str(&text) {
        Ok(body) => FetchResult::Success {
            status: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::fatal(format!("malformed response body: {e}")),
    }
}

fn classify_send_error(error: &reqwest::Error) -> FetchResult {
    if error.is_timeout() {
        FetchResult::transient(format!("request timed out: {error}"))
    } else if error.is_connect() || error.is_request() {
        FetchResult::transient(format!("connection failed: {error}"))
    } else {
        FetchResult::fatal(format!("request could not be sent: {error}"))
    }
}

/// Extract the retry-after header value, in seconds
fn extract_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= CAUSE_BODY_LIMIT {
        return body.to_string();
    }
    let mut short: String = body.chars().take(CAUSE_BODY_LIMIT).collect();
    short.push_str("...");
    short
}
