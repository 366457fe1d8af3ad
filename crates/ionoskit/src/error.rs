//! Error types for API calls.
//!
//! Errors are categorized so callers can tell transient failures from
//! rejected requests and missing objects.

use converge::AdapterError;
use std::fmt;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connectivity problems or server-side failures (transient, retryable).
    Network,
    /// Missing or rejected credentials.
    Auth,
    /// The object or path does not exist.
    NotFound,
    /// The request conflicts with the current remote state.
    Conflict,
    /// The API rejected the request as invalid.
    Rejected,
    /// The response could not be understood.
    Format,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication failed",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflicting remote state",
            Self::Rejected => "Request rejected by the API",
            Self::Format => "Unexpected API response",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and the API URL, then try again",
            Self::Auth => "Set IONOS_TOKEN, or IONOS_USERNAME and IONOS_PASSWORD",
            Self::NotFound => "Verify the identifier and the parent resource",
            Self::Conflict => "Wait for pending requests on the resource to finish",
            Self::Rejected => "Check the parameter values in the error message",
            Self::Format => "The API URL may point at the wrong service",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither a token nor a username/password pair was supplied.
    #[error("missing credentials: a token or both username and password are required")]
    MissingCredentials,

    /// HTTP 404.
    #[error("not found: {path}")]
    NotFound {
        /// Requested path.
        path: String,
    },

    /// HTTP 409.
    #[error("conflict: {message}")]
    Conflict {
        /// API error message.
        message: String,
    },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code.
        status: u16,
        /// API error message.
        message: String,
    },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingCredentials => ErrorCategory::Auth,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Http { status, .. } => match status {
                401 | 403 => ErrorCategory::Auth,
                429 | 500..=599 => ErrorCategory::Network,
                _ => ErrorCategory::Rejected,
            },
            Error::Network(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(code, format!("HTTP {code}")),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<Error> for AdapterError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { path } => AdapterError::NotFound { what: path },
            Error::Conflict { message } => AdapterError::Conflict { message },
            Error::Http { status, message } => AdapterError::Api { status, message },
            Error::Network(message) => AdapterError::Transport { message },
            other @ (Error::MissingCredentials | Error::InvalidResponse(_)) => {
                AdapterError::Transport {
                    message: other.to_string(),
                }
            }
        }
    }
}
