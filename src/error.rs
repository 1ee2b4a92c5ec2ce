//! Error types for the letter workflow engine.

use crate::status::RequestStatus;
use crate::types::{RequestId, Version};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to encode record: {0}")]
    Encode(String),

    #[error("Failed to decode record: {0}")]
    Decode(String),

    #[error("Record for request {request_id} changed concurrently (expected revision {expected}, found {found})")]
    RevisionMismatch {
        request_id: RequestId,
        expected: u64,
        found: u64,
    },

    #[error("Request {0} already exists")]
    AlreadyExists(RequestId),

    #[error("Request {0} is not stored")]
    Missing(RequestId),

    #[error("Snapshot {version} of request {request_id} failed integrity check")]
    Corrupted {
        request_id: RequestId,
        version: Version,
    },
}

/// Illegal status transition or an operation the current status forbids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("Cannot {operation} while request is {status}")]
    OperationNotPermitted {
        status: RequestStatus,
        operation: &'static str,
    },
}

/// A template skeleton referenced placeholders that had no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Template '{template_id}' has unresolved placeholders: {}", missing.join(", "))]
pub struct BindingError {
    pub template_id: String,
    /// Every unresolved key, sorted and de-duplicated.
    pub missing: Vec<String>,
}

/// Failure reported by (or while talking to) the text-generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("Provider returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider call timed out after {0} ms")]
    Timeout(u64),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Stable classification of [`ApiError`] for API layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    State,
    Binding,
    Generation,
    Conflict,
    Validation,
    NotFound,
    Permission,
    Storage,
    Config,
    Render,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::State => "state",
            ErrorKind::Binding => "binding",
            ErrorKind::Generation => "generation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Permission => "permission",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
            ErrorKind::Render => "render",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced at the caller boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("Generation failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("Version {version} not found for request {request_id}")]
    VersionNotFound {
        request_id: RequestId,
        version: Version,
    },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render failed: {0}")]
    Render(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::State(_) => ErrorKind::State,
            ApiError::Binding(_) => ErrorKind::Binding,
            ApiError::Generation(_) => ErrorKind::Generation,
            // A lost optimistic write is a conflict from the caller's point of view.
            ApiError::Conflict(_)
            | ApiError::Storage(StorageError::RevisionMismatch { .. }) => ErrorKind::Conflict,
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::RequestNotFound(_)
            | ApiError::VersionNotFound { .. }
            | ApiError::TemplateNotFound(_)
            | ApiError::Storage(StorageError::Missing(_)) => ErrorKind::NotFound,
            ApiError::Permission(_) => ErrorKind::Permission,
            ApiError::Storage(_) => ErrorKind::Storage,
            ApiError::Config(_) => ErrorKind::Config,
            ApiError::Render(_) => ErrorKind::Render,
        }
    }

    /// Whether retrying the same call unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Generation | ErrorKind::Conflict)
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}
