//! Error types for reconciliation.
//!
//! Adapter failures are typed ([`AdapterError`]) and propagated unchanged
//! inside [`Error::Api`]. The engine adds its own decision failures and every
//! error leaving the engine is wrapped in a [`ReconcileError`] that records the
//! action that was in flight.

use crate::types::{Action, Intent};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a resource adapter (the vendor SDK boundary).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The object (or its parent) no longer exists
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The API rejected the request because of a conflicting state
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Any other non-success API response
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The adapter does not implement this operation
    #[error("operation not supported by this adapter: {operation}")]
    Unsupported { operation: String },
}

impl AdapterError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Categories of reconciliation errors.
///
/// Categories tell the caller whether re-running the whole reconciliation is
/// worthwhile. The engine itself never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller's input cannot be acted on as given
    Input,
    /// The remote state makes the request unsafe
    Conflict,
    /// The remote operation is still running or failed remotely
    Operation,
    /// Transport, auth or validation failure from the API
    Api,
}

impl ErrorCategory {
    /// Whether re-running the reconciliation may succeed without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Operation | Self::Api)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Input => "Invalid parameters",
            Self::Conflict => "Remote state conflict",
            Self::Operation => "Remote operation did not complete",
            Self::Api => "API request failed",
        }
    }

    /// Actionable advice for resolving this category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Input => "Check the identifier and required parameters",
            Self::Conflict => {
                "Use a unique identifier, pick another name, or pass --allow-replace"
            }
            Self::Operation => "Raise the wait timeout or inspect the resource in the console",
            Self::Api => "Check credentials, API URL and connectivity, then re-run",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors produced while reconciling one resource.
#[derive(Debug, Error)]
pub enum Error {
    /// More than one object matched the identifier
    #[error("found {count} resources of type {kind} for '{identifier}'")]
    AmbiguousMatch {
        kind: String,
        identifier: String,
        count: usize,
    },

    /// An operation required an existing object that is absent
    #[error("{kind} '{identifier}' not found")]
    NotFound { kind: String, identifier: String },

    /// Immutable properties changed and replacement was not authorized
    #[error("{kind} '{identifier}' should be replaced but allow_replace is set to false")]
    ReplacementNotAllowed { kind: String, identifier: String },

    /// A rename would clash with another live object
    #[error("another {kind} with the desired name ({name}) exists: {existing_id}")]
    NameCollision {
        kind: String,
        name: String,
        existing_id: String,
    },

    /// The remote asynchronous operation reported failure
    #[error("{kind} {action} operation failed: {message}")]
    OperationFailed {
        kind: String,
        action: Action,
        message: String,
    },

    /// The wait budget ran out before the operation finished
    #[error(
        "timed out after {:.1}s waiting for {kind} '{identifier}' to {action}",
        .timeout.as_secs_f64()
    )]
    Timeout {
        kind: String,
        identifier: String,
        action: Action,
        timeout: Duration,
    },

    /// Adapter call failed
    #[error(transparent)]
    Api(#[from] AdapterError),

    /// A parameter required by the intent is unset
    #[error("{field} parameter is required for state '{intent}' of {kind}")]
    MissingParameter {
        kind: String,
        intent: Intent,
        field: String,
    },

    /// Neither an identifier nor a desired name was supplied
    #[error("an identifier or name is required for state '{intent}' of {kind}")]
    MissingIdentifier { kind: String, intent: Intent },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. }
            | Error::MissingParameter { .. }
            | Error::MissingIdentifier { .. } => ErrorCategory::Input,
            Error::AmbiguousMatch { .. }
            | Error::ReplacementNotAllowed { .. }
            | Error::NameCollision { .. } => ErrorCategory::Conflict,
            Error::OperationFailed { .. } | Error::Timeout { .. } => ErrorCategory::Operation,
            Error::Api(AdapterError::Conflict { .. }) => ErrorCategory::Conflict,
            Error::Api(_) => ErrorCategory::Api,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// True for adapter-level "object is gone" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api(e) if e.is_not_found())
    }
}

/// An [`Error`] together with the resource kind and the action in flight.
#[derive(Debug, Error)]
#[error("failed to {action} the {kind}: {error}")]
pub struct ReconcileError {
    pub kind: String,
    pub action: Action,
    pub error: Error,
}

impl ReconcileError {
    pub fn new(kind: impl Into<String>, action: Action, error: impl Into<Error>) -> Self {
        Self {
            kind: kind.into(),
            action,
            error: error.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}
