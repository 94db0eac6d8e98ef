//! Error types for the flowctl client.
//!
//! This module provides the error hierarchy for all operations in the
//! workload lifecycle: spec loading, variable resolution, orchestration API
//! calls, and phase tracking.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flowctl operations.
#[derive(Debug, Error)]
pub enum FlowctlError {
    /// Spec loading errors.
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    /// Variable resolution errors.
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Orchestration API errors.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Lifecycle tracking errors.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Spec loading and parsing errors.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The spec file was not found.
    #[error("Spec file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The spec file could not be parsed.
    #[error("Failed to parse spec: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// The spec is missing its kind discriminator.
    #[error("Spec is missing the required `kind` field")]
    MissingKind,

    /// The spec declares an unknown kind.
    #[error("Unknown spec kind: {kind} (expected `flow` or `deployment`)")]
    UnknownKind {
        /// The unrecognized kind value.
        kind: String,
    },

    /// An environment file could not be loaded.
    #[error("Failed to load env file {path}: {message}")]
    EnvFile {
        /// Path to the env file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Variable resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A reference expression is malformed and cannot be evaluated.
    #[error("Malformed reference `{expression}`: {reason}")]
    Template {
        /// The offending reference expression.
        expression: String,
        /// Why it could not be evaluated.
        reason: String,
    },
}

/// Orchestration API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("Not logged in or forbidden: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed with a non-success status.
    #[error("API request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body or error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Workload not found.
    #[error("Workload not found: {workload_id}")]
    NotFound {
        /// ID of the missing workload.
        workload_id: String,
    },

    /// Network error.
    #[error("Network error communicating with the API: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from the API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Lifecycle tracking errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The remote phase left the declared in-flight set.
    #[error(
        "Workload {workload_id} entered unexpected phase {observed} (last good phase: {last_good})"
    )]
    UnexpectedPhase {
        /// ID of the workload.
        workload_id: String,
        /// Last phase that was still on the expected path.
        last_good: String,
        /// The phase that diverged from the expected path.
        observed: String,
    },

    /// The desired phase was not reached within the wait budget.
    #[error(
        "Workload {workload_id} did not reach phase {desired} after waiting {waited_secs}s"
    )]
    Timeout {
        /// ID of the workload.
        workload_id: String,
        /// The phase that was never reached.
        desired: String,
        /// Total seconds waited.
        waited_secs: u64,
    },

    /// Spec validation reported errors before submission.
    #[error("Spec validation failed with {count} error(s):\n{errors}")]
    ValidationFailed {
        /// Number of validation errors.
        count: usize,
        /// The validation errors, one per line.
        errors: String,
    },

    /// One or more targets of a bulk removal failed.
    #[error("Failed to remove {failed} of {attempted} workload(s)")]
    RemovalFailed {
        /// Number of targets that failed.
        failed: usize,
        /// Number of targets in the batch.
        attempted: usize,
    },
}

/// Result type alias for flowctl operations.
pub type Result<T> = std::result::Result<T, FlowctlError>;

impl FlowctlError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api(ApiError::RateLimited { .. } | ApiError::NetworkError { .. }) => true,
            Self::Api(ApiError::RequestFailed { status, .. }) => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error means the workload is already gone.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(ApiError::NotFound { .. }))
    }
}

impl ResolveError {
    /// Creates a template error for a reference expression.
    #[must_use]
    pub fn template(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Template {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

impl ApiError {
    /// Creates an API request error.
    #[must_use]
    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
