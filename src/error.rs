//! Error types for the Freshrelease connector
//!
//! Every public API returns `Result<T, Error>`. Variants are grouped by the
//! stage that raises them so a failed run can be traced back to input,
//! transport, decoding or storage.

use thiserror::Error;

/// The main error type for the connector
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Input Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Bad input: {message}")]
    BadInput { message: String },

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Rate limited by {url}, retry after {retry_after_seconds}s")]
    RateLimited {
        url: String,
        retry_after_seconds: u64,
    },

    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Failed to convert {table}: {message}")]
    Convert { table: String, message: String },

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Store error: {0}")]
    Store(#[from] duckdb::Error),

    #[error("Store error: {message}")]
    StoreState { message: String },

    // ============================================================================
    // Orchestration Errors
    // ============================================================================
    #[error("Subtask '{subtask}' failed: {source}")]
    Subtask {
        subtask: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Unknown subtask: {name}")]
    UnknownSubtask { name: String },

    #[error("Cancelled")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
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

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a bad input error
    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::BadInput {
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a conversion error
    pub fn convert(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Convert {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a store error from a message
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreState {
            message: message.into(),
        }
    }

    /// Wrap an error with the name of the subtask that raised it
    pub fn in_subtask(self, subtask: impl Into<String>) -> Self {
        Self::Subtask {
            subtask: subtask.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if the server answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::HttpStatus { status: 404, .. })
    }

    /// Check if this error was raised before any I/O took place
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingConfigField { .. }
                | Error::InvalidConfigValue { .. }
                | Error::BadInput { .. }
                | Error::Regex(_)
        )
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for the connector
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("boardId");
        assert_eq!(err.to_string(), "Missing required config field: boardId");

        let err = Error::http_status(404, "https://x.test/rest/api/2/issue/1", "Not found");
        assert_eq!(
            err.to_string(),
            "HTTP 404 from https://x.test/rest/api/2/issue/1: Not found"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            url: String::new(),
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::http_status(429, "", "").is_retryable());
        assert!(Error::http_status(503, "", "").is_retryable());

        assert!(!Error::http_status(400, "", "").is_retryable());
        assert!(!Error::http_status(404, "", "").is_retryable());
        assert!(!Error::bad_input("boardId").is_retryable());
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::http_status(404, "", "").is_not_found());
        assert!(!Error::http_status(403, "", "").is_not_found());
        assert!(!Error::Cancelled.is_not_found());
    }

    #[test]
    fn test_input_errors_are_classified() {
        assert!(Error::bad_input("invalid boardId:0").is_input_error());
        assert!(Error::missing_field("connectionId").is_input_error());
        assert!(!Error::decode("eof").is_input_error());
        assert!(!Error::Cancelled.is_input_error());
    }

    #[test]
    fn test_subtask_wrapping_keeps_source() {
        let err = Error::decode("unexpected eof").in_subtask("extractIssues");
        assert_eq!(
            err.to_string(),
            "Subtask 'extractIssues' failed: Failed to decode response: unexpected eof"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
