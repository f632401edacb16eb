//! Error types for tablescope.
//!
//! This module provides a unified error type [`TablescopeError`] for all
//! tablescope operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Lineage**: edge lookups against the lineage service ([`TablescopeError::Retrieval`])
//! - **Access counts**: authentication, permission, network, timeout and
//!   rate-limit failures raised by access-count origins
//! - **Input**: malformed table identifiers and filter criteria
//! - **Configuration**: invalid settings or unreadable config files
//!
//! # Example
//!
//! ```rust
//! use tablescope::error::{ErrorKind, TablescopeError};
//!
//! let err = TablescopeError::PermissionDenied("jobs.listAll".into());
//! assert_eq!(err.kind(), ErrorKind::Permission);
//! assert!(!err.is_retryable());
//! println!("{}", err.user_message());
//! ```

use std::io;
use thiserror::Error;

/// Main error type for tablescope operations.
#[derive(Error, Debug)]
pub enum TablescopeError {
    // Lineage errors
    #[error("Lineage retrieval failed during {operation}: {message}")]
    Retrieval { operation: String, message: String },

    // Access count origin errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Input errors
    #[error("Invalid table identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid filter criteria: {0}")]
    InvalidCriteria(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`TablescopeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Retrieval,
    Authentication,
    Permission,
    Network,
    Timeout,
    Other,
}

impl TablescopeError {
    /// Shorthand for a lineage retrieval failure.
    pub fn retrieval(operation: impl Into<String>, message: impl Into<String>) -> Self {
        TablescopeError::Retrieval {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Classify the error. Rate limiting counts as a network condition.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TablescopeError::Retrieval { .. } => ErrorKind::Retrieval,
            TablescopeError::Authentication(_) => ErrorKind::Authentication,
            TablescopeError::PermissionDenied(_) => ErrorKind::Permission,
            TablescopeError::Network(_) | TablescopeError::RateLimited(_) => ErrorKind::Network,
            TablescopeError::Timeout(_) => ErrorKind::Timeout,
            _ => ErrorKind::Other,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TablescopeError::Network(_)
                | TablescopeError::Timeout(_)
                | TablescopeError::RateLimited(_)
        )
    }

    /// Whether a failed origin fetch may be downgraded to a report warning.
    ///
    /// Invalid criteria are a caller bug and always propagate. Anything else a
    /// source returns, including rows it could not parse, is a source failure.
    pub fn is_source_failure(&self) -> bool {
        !matches!(self, TablescopeError::InvalidCriteria(_))
    }

    /// Render a message telling the operator how to recover.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Authentication => "Authentication failed. Run \
                 'gcloud auth application-default login' to set up credentials, \
                 then retry the operation."
                .to_string(),
            ErrorKind::Permission => "Permission denied. Ensure the account has the required IAM roles:\n\
                 - schema statistics: 'roles/bigquery.resourceViewer' or the \
                 'bigquery.jobs.listAll' permission\n\
                 - audit logs: 'roles/logging.viewer' or the \
                 'logging.logEntries.list' permission\n\
                 - lineage: 'roles/datalineage.viewer'"
                .to_string(),
            ErrorKind::Network | ErrorKind::Timeout => format!(
                "A network error occurred while talking to Google Cloud ({}). \
                 Check connectivity and retry; if the problem persists, try again later.",
                self
            ),
            ErrorKind::Retrieval | ErrorKind::Other => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for TablescopeError {
    fn from(e: serde_json::Error) -> Self {
        TablescopeError::Serialization(e.to_string())
    }
}

impl From<regex::Error> for TablescopeError {
    fn from(e: regex::Error) -> Self {
        TablescopeError::InvalidCriteria(e.to_string())
    }
}

/// Result type alias for tablescope operations.
pub type Result<T> = std::result::Result<T, TablescopeError>;
