//! Error types for Azure DevOps operations.
//!
//! Errors are categorized so that the retry layer knows what is transient and
//! callers can tell a missing entity from a conflicting one or an invalid
//! reference.

use crate::types::RefUpdateStatus;
use std::fmt;

/// Result type alias for Azure DevOps operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors surfaced by reconcilers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No ref source was supplied.
    MissingRef,
    /// A supplied ref source does not resolve to a commit.
    RefNotFound,
    /// The target already exists or its state changed concurrently.
    Conflict,
    /// The entity does not exist.
    NotFound,
    /// Network or server hiccup; worth retrying.
    Transient,
    /// The operation was cancelled or ran past its deadline.
    Interrupted,
    /// Anything else; surfaced verbatim.
    Fatal,
}

impl ErrorCategory {
    /// Whether this error category is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingRef => "No ref source supplied",
            Self::RefNotFound => "Reference not found",
            Self::Conflict => "Conflicting remote state",
            Self::NotFound => "Entity not found",
            Self::Transient => "Transient service or network failure",
            Self::Interrupted => "Operation interrupted",
            Self::Fatal => "Request failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::MissingRef => "Set exactly one of ref_branch, ref_commit_id or ref_tag",
            Self::RefNotFound => "Check that the branch, tag or commit exists in the repository",
            Self::Conflict => "Import the existing entity or choose a different name",
            Self::NotFound => "The entity may have been deleted outside of azdo",
            Self::Transient => "Check your connection and try again",
            Self::Interrupted => "Increase --timeout or re-run the command",
            Self::Fatal => "Check the organization URL, token permissions and inputs",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to Azure DevOps.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// None of the ref source inputs was supplied.
    #[error("one of ref_branch, ref_commit_id or ref_tag must be set")]
    MissingRef,

    /// A ref source does not resolve.
    #[error("No refs found that match ref \"{reference}\"")]
    RefNotFound {
        /// The fully-qualified ref (or raw commit id) that was looked up.
        reference: String,
    },

    /// The target already exists or changed underneath us.
    #[error("conflict: {message}")]
    Conflict {
        /// Error message.
        message: String,
    },

    /// An entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity ("project", "repository", ...).
        kind: &'static str,
        /// Identity that was looked up.
        id: String,
    },

    /// The service answered with a non-success status.
    #[error("Azure DevOps API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Service error type key, e.g. "ProjectAlreadyExistsException".
        type_key: Option<String>,
        /// Error message.
        message: String,
    },

    /// The request never got an answer.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// The caller supplied an unusable value.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Error message.
        message: String,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The service refused a ref update.
    #[error("ref update for {name} rejected: {status}{}", detail(.message))]
    RefUpdateRejected {
        /// Full ref name.
        name: String,
        /// Update status reported by the service.
        status: RefUpdateStatus,
        /// Custom message from a policy or plugin.
        message: Option<String>,
    },

    /// A queued long-running operation did not succeed.
    #[error("operation {id} {status}: {message}")]
    OperationFailed {
        /// Operation id.
        id: String,
        /// Final status.
        status: String,
        /// Result message.
        message: String,
    },

    /// Provider configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The operation context was cancelled or expired.
    #[error(transparent)]
    Interrupted(#[from] reconcile::Interrupted),
}

impl Error {
    /// Create a ref-not-found error for a fully-qualified reference.
    pub fn ref_not_found(reference: impl Into<String>) -> Self {
        Self::RefNotFound {
            reference: reference.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an API error without a type key.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            type_key: None,
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingRef => ErrorCategory::MissingRef,
            Error::RefNotFound { .. } => ErrorCategory::RefNotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Api {
                status, type_key, ..
            } => classify_api(*status, type_key.as_deref()),
            Error::Network { .. } => ErrorCategory::Transient,
            Error::RefUpdateRejected { status, .. } => match status {
                RefUpdateStatus::StaleOldObjectId | RefUpdateStatus::RefNameConflict => {
                    ErrorCategory::Conflict
                }
                _ => ErrorCategory::Fatal,
            },
            Error::Interrupted(_) => ErrorCategory::Interrupted,
            Error::InvalidInput { .. }
            | Error::InvalidResponse(_)
            | Error::OperationFailed { .. }
            | Error::Config(_) => ErrorCategory::Fatal,
        }
    }

    /// Whether this error is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this error means the entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this error means the entity exists or changed concurrently.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({m})"))
        .unwrap_or_default()
}

fn classify_api(status: u16, type_key: Option<&str>) -> ErrorCategory {
    if let Some(key) = type_key {
        if key.contains("AlreadyExists") {
            return ErrorCategory::Conflict;
        }
        if key.contains("NotFound") || key.contains("DoesNotExist") {
            return ErrorCategory::NotFound;
        }
    }
    match status {
        404 => ErrorCategory::NotFound,
        409 => ErrorCategory::Conflict,
        408 | 429 | 500..=599 => ErrorCategory::Transient,
        _ => ErrorCategory::Fatal,
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::api(code, format!("HTTP {code}")),
            ureq::Error::Timeout(_)
            | ureq::Error::Io(_)
            | ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound => Self::network(err.to_string()),
            other => Self::api(0, other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
