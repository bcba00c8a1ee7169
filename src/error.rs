//! Error types for gridload
//!
//! Every public API returns `Result<T, Error>` with the error defined here.
//! Fetch outcomes that callers are expected to branch on (rate limits,
//! transient failures) are modelled as values in [`crate::http::FetchResult`];
//! the variants below are what remains once a caller has given up.

use crate::load::LoadPhase;
use thiserror::Error;

/// The main error type for gridload
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Fetch Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited by remote service")]
    RateLimited { retry_after_seconds: Option<u64> },

    #[error("Transient failure: {cause}")]
    Transient { cause: String },

    #[error("Fatal failure: {cause}")]
    Fatal { cause: String },

    #[error("Gave up after {attempts} attempts: {last_cause}")]
    MaxRetriesExceeded { attempts: u32, last_cause: String },

    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Schema and Data Errors
    // ============================================================================
    #[error("Schema conflict: {message}")]
    SchemaConflict { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // ============================================================================
    // Sink and Load Errors
    // ============================================================================
    #[error("Sink error: {message}")]
    Sink { message: String, transient: bool },

    #[error("Load into '{table}' failed during {phase} ({rows_applied} rows applied): {source}")]
    Load {
        table: String,
        phase: LoadPhase,
        rows_applied: usize,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Cancelled")]
    Cancelled,

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    pub fn transient(cause: impl Into<String>) -> Self {
        Self::Transient {
            cause: cause.into(),
        }
    }

    pub fn fatal(cause: impl Into<String>) -> Self {
        Self::Fatal {
            cause: cause.into(),
        }
    }

    /// Create a GraphQL error
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::GraphQl {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a schema conflict error
    pub fn schema_conflict(message: impl Into<String>) -> Self {
        Self::SchemaConflict {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a sink error that will not succeed on retry
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
            transient: false,
        }
    }

    /// Create a sink error that may succeed on retry (lost connection, lock timeout)
    pub fn sink_transient(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
            transient: true,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. } | Error::Transient { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            Error::Sink { transient, .. } => *transient,
            _ => false,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        // Connection drops and lock contention surface as plain messages
        let transient = ["connection", "timeout", "timed out", "could not lock", "conflict on tuple"]
            .iter()
            .any(|needle| lowered.contains(needle));
        Self::Sink { message, transient }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 403 | 408 | 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for gridload
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
