//! Error types for the hierarchy group reconciler.
//!
//! This module provides the error hierarchy for every stage of an update:
//! configuration, request documents, callback context storage, remote calls
//! and the handler itself. [`ErrorKind`] is the coarse taxonomy reported back
//! to the workflow engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::remote::OperationKind;

/// The main error type for the reconciler.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Request document errors.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Callback context storage errors.
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Remote service errors.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Update handler errors.
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure taxonomy surfaced to the external workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The request itself is invalid; retrying cannot help.
    InvalidRequest,
    /// The target identity does not exist remotely.
    NotFound,
    /// Transport or remote-side failure.
    ServiceFailure,
    /// The remote service throttled the call.
    Throttling,
    /// Anything unexpected.
    GeneralFailure,
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file was not found.
    #[error("Settings file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The settings file could not be parsed.
    #[error("Failed to parse settings: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A setting has an unusable value.
    #[error("Invalid setting {field}: {message}")]
    InvalidValue {
        /// Setting that is invalid.
        field: String,
        /// Description of the problem.
        message: String,
    },
}

/// Request document errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request file was not found.
    #[error("Request file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The request document could not be parsed.
    #[error("Failed to parse request: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Snapshot validation failed.
    #[error("Request validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Callback context storage errors.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Stored context is unreadable.
    #[error("Callback context is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// A slot value could not be encoded.
    #[error("Callback context serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// Filesystem backend error.
    #[error("Local context backend error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 context backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// Lock acquisition failed.
    #[error("Failed to acquire context lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// Another invocation holds the lock for this resource.
    #[error("Resource {resource} is locked by another invocation (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Resource key the lock guards.
        resource: String,
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },
}

/// Errors reported by a remote operation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service rejected the request as malformed or conflicting.
    #[error("{operation} rejected for {resource}: {message}")]
    InvalidRequest {
        /// Operation that failed.
        operation: OperationKind,
        /// Resource identity the call targeted.
        resource: String,
        /// Service message.
        message: String,
    },

    /// Target identity does not exist.
    #[error("{operation} failed, {resource} not found: {message}")]
    NotFound {
        /// Operation that failed.
        operation: OperationKind,
        /// Resource identity the call targeted.
        resource: String,
        /// Service message.
        message: String,
    },

    /// Call was throttled.
    #[error("{operation} throttled for {resource}: {message}")]
    Throttled {
        /// Operation that failed.
        operation: OperationKind,
        /// Resource identity the call targeted.
        resource: String,
        /// Service message.
        message: String,
    },

    /// Transport failure or internal service error.
    #[error("{operation} failed for {resource}: {message}")]
    ServiceFailure {
        /// Operation that failed.
        operation: OperationKind,
        /// Resource identity the call targeted.
        resource: String,
        /// Service or transport message.
        message: String,
    },

    /// Unclassified failure.
    #[error("{operation} failed unexpectedly for {resource}: {message}")]
    Unexpected {
        /// Operation that failed.
        operation: OperationKind,
        /// Resource identity the call targeted.
        resource: String,
        /// Description of the failure.
        message: String,
    },
}

/// Update handler errors.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An immutable field was changed.
    #[error("{field} cannot be updated for UserHierarchyGroup:{resource}.")]
    ImmutableField {
        /// Name of the immutable field.
        field: &'static str,
        /// Resource identity.
        resource: String,
    },

    /// The requested change cannot be expressed as remote calls.
    #[error("Invalid update for {resource}: {reason}")]
    InvalidUpdate {
        /// Resource identity.
        resource: String,
        /// Why the update is invalid.
        reason: String,
    },

    /// A remote step failed; later steps were not attempted.
    #[error("Step {step} failed for UserHierarchyGroup:{resource}: {source}")]
    StepFailed {
        /// Step key that failed.
        step: String,
        /// Group the plan was updating.
        resource: String,
        /// Underlying remote error.
        #[source]
        source: RemoteError,
    },
}

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, ReconcilerError>;

impl ReconcilerError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the failure kind reported to the workflow engine.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Request(_) => ErrorKind::InvalidRequest,
            Self::Remote(err) => err.kind(),
            Self::Handler(err) => err.kind(),
            Self::Context(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::GeneralFailure,
        }
    }

    /// Returns true if the engine may retry the whole reconciliation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Throttling | ErrorKind::ServiceFailure)
            || matches!(self, Self::Context(ContextError::LockedByOther { .. }))
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self.kind() {
            ErrorKind::Throttling => Some(30),
            ErrorKind::ServiceFailure => Some(5),
            _ => match self {
                Self::Context(ContextError::LockedByOther { .. }) => Some(10),
                _ => None,
            },
        }
    }
}

impl RemoteError {
    /// Returns the failure kind of this remote error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Throttled { .. } => ErrorKind::Throttling,
            Self::ServiceFailure { .. } => ErrorKind::ServiceFailure,
            Self::Unexpected { .. } => ErrorKind::GeneralFailure,
        }
    }

    /// Returns the operation that failed.
    #[must_use]
    pub const fn operation(&self) -> OperationKind {
        match self {
            Self::InvalidRequest { operation, .. }
            | Self::NotFound { operation, .. }
            | Self::Throttled { operation, .. }
            | Self::ServiceFailure { operation, .. }
            | Self::Unexpected { operation, .. } => *operation,
        }
    }

    /// Builds a remote error of the given kind.
    #[must_use]
    pub fn of_kind(
        kind: ErrorKind,
        operation: OperationKind,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let resource = resource.into();
        let message = message.into();
        match kind {
            ErrorKind::InvalidRequest => Self::InvalidRequest { operation, resource, message },
            ErrorKind::NotFound => Self::NotFound { operation, resource, message },
            ErrorKind::Throttling => Self::Throttled { operation, resource, message },
            ErrorKind::ServiceFailure => Self::ServiceFailure { operation, resource, message },
            ErrorKind::GeneralFailure => Self::Unexpected { operation, resource, message },
        }
    }
}

impl HandlerError {
    /// Returns the failure kind of this handler error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ImmutableField { .. } | Self::InvalidUpdate { .. } => ErrorKind::InvalidRequest,
            Self::StepFailed { source, .. } => source.kind(),
        }
    }
}

impl RequestError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ContextError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a local storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::NotFound => "NotFound",
            Self::ServiceFailure => "ServiceInternalError",
            Self::Throttling => "Throttling",
            Self::GeneralFailure => "GeneralServiceException",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_kind_roundtrip() {
        for kind in [
            ErrorKind::InvalidRequest,
            ErrorKind::NotFound,
            ErrorKind::ServiceFailure,
            ErrorKind::Throttling,
            ErrorKind::GeneralFailure,
        ] {
            let err = RemoteError::of_kind(kind, OperationKind::DeleteGroup, "arn:group", "boom");
            assert_eq!(err.kind(), kind);
            assert_eq!(err.operation(), OperationKind::DeleteGroup);
        }
    }

    #[test]
    fn test_step_failure_message_names_operation_and_resource() {
        let err = HandlerError::StepFailed {
            step: String::from("recreate.delete"),
            resource: String::from("arn:aws:connect:us-west-2:111111111111:instance/i/agent-group/g"),
            source: RemoteError::of_kind(
                ErrorKind::NotFound,
                OperationKind::DeleteGroup,
                "arn:aws:connect:us-west-2:111111111111:instance/i/agent-group/g",
                "gone",
            ),
        };
        let message = err.to_string();
        assert!(message.contains("DeleteUserHierarchyGroup"));
        assert!(message.contains("agent-group/g"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_retryable() {
        let throttled = ReconcilerError::Remote(RemoteError::of_kind(
            ErrorKind::Throttling,
            OperationKind::CreateGroup,
            "g",
            "slow down",
        ));
        assert!(throttled.is_retryable());
        assert_eq!(throttled.retry_delay_secs(), Some(30));

        let immutable = ReconcilerError::Handler(HandlerError::ImmutableField {
            field: "InstanceArn",
            resource: String::from("g"),
        });
        assert!(!immutable.is_retryable());
        assert_eq!(immutable.kind(), ErrorKind::InvalidRequest);
        assert_eq!(immutable.retry_delay_secs(), None);
    }
}
