//! Error type for operation dispatch, parameter reads and the task facade.

use docmcp_tasks::TaskError;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced synchronously to the caller of a docmcp operation.
///
/// Faults raised while a background task runs are never returned here;
/// they are recorded on the task and observed by polling.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: a missing or unconvertible parameter, an unknown
    /// operation name, an empty identifier.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The call is valid but cannot be honoured in the current state,
    /// e.g. a duplicate registration or a failed handler instantiation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// No task with this ID is visible to the caller.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// The requested task ID.
        task_id: String,
    },

    /// Rejected by the task subsystem.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A handler failed while running an operation.
    #[error("operation '{operation}' failed: {message}")]
    Handler {
        /// The operation that failed.
        operation: String,
        /// What went wrong.
        message: String,
    },
}

impl Error {
    /// Creates an [`Error::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an [`Error::InvalidOperation`].
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Creates an [`Error::Handler`].
    pub fn handler(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Maps this error to a JSON-RPC error code.
    ///
    /// - `-32602` (Invalid params): `InvalidArgument`, `TaskNotFound`
    /// - `-32603` (Internal error): `InvalidOperation`, `Handler`
    /// - `Task` errors use [`TaskError::error_code`]
    pub fn error_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::TaskNotFound { .. } => -32602,
            Self::InvalidOperation(_) | Self::Handler { .. } => -32603,
            Self::Task(err) => err.error_code(),
        }
    }

    /// Returns `true` for malformed-input errors.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            Self::InvalidArgument(_) | Self::TaskNotFound { .. } => true,
            Self::Task(err) => err.is_invalid_argument(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(Error::invalid_argument("x").error_code(), -32602);
        assert_eq!(Error::invalid_operation("x").error_code(), -32603);
        assert_eq!(
            Error::TaskNotFound {
                task_id: "abc".into()
            }
            .error_code(),
            -32602
        );
        assert_eq!(Error::handler("merge", "boom").error_code(), -32603);
    }

    #[test]
    fn task_errors_keep_their_code_and_message() {
        let err: Error = TaskError::ConcurrencyLimit { limit: 3 }.into();
        assert_eq!(err.error_code(), -32603);
        assert!(!err.is_invalid_argument());
        assert_eq!(err.to_string(), "max concurrent tasks reached (3)");

        let err: Error = TaskError::EmptyArgument { name: "tool_name" }.into();
        assert!(err.is_invalid_argument());
    }
}
