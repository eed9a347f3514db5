use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

/// HTTP error classification
#[derive(Error, Debug, Clone)]
pub enum HttpErrorKind {
    #[error("Client error: {message}")]
    Client { message: String },
    #[error("Server error: {message}")]
    Server { message: String },
}

/// Main crate error type
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// HTTP error with status code and classification
    #[error("HTTP error (status {status}): {kind}")]
    Http { status: u16, kind: HttpErrorKind },

    /// Generic request error (connection refused, TLS, body read)
    #[error("Generic request error: {0}")]
    GenericRequest(String),

    /// Request exceeded its configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// JSON parse error
    #[error("Json parse error: {0}")]
    JsonParse(String),

    /// Provider returned empty or unusable series data
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Missing or invalid process configuration. Fatal at start.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Signal store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Text generation failed or returned an unusable shape
    #[error("Generation failure: {0}")]
    Generation(String),

    /// Generated asset section did not begin with its required prefix
    #[error("Narrative contract violation in `{section}`: expected prefix {expected_prefix:?}")]
    NarrativeContractViolation {
        section: String,
        expected_prefix: String,
    },
}

// Convenience constructors for common error patterns
impl Error {
    /// Create an HTTP client error
    pub fn client_error(status: u16, message: String) -> Self {
        Error::Http {
            status,
            kind: HttpErrorKind::Client { message },
        }
    }

    /// Create an HTTP server error
    pub fn server_error(status: u16, message: String) -> Self {
        Error::Http {
            status,
            kind: HttpErrorKind::Server { message },
        }
    }

    /// Create a JSON parse error
    pub fn json_parse(msg: impl Into<String>) -> Self {
        Error::JsonParse(msg.into())
    }

    /// Create a generation failure
    pub fn generation(msg: impl Into<String>) -> Self {
        Error::Generation(msg.into())
    }

    /// Whether this error is fatal for the whole process rather than one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::GenericRequest(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::JsonParse(e.to_string())
    }
}
