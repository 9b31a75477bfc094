//! Error types for task operations.
//!
//! Provides [`TaskError`], the error enum returned by every fallible task
//! operation, with JSON-RPC error code mapping for the protocol layer.

use thiserror::Error;

/// Errors that can occur while admitting tasks or validating configuration.
///
/// Faults raised by a tool *while a task runs* never surface as a
/// `TaskError`; the executor records them on the task instead.
///
/// # Examples
///
/// ```
/// use docmcp_tasks::TaskError;
///
/// let err = TaskError::ConcurrencyLimit { limit: 4 };
/// assert_eq!(err.error_code(), -32603);
/// assert!(err.to_string().contains("max concurrent tasks reached"));
/// ```
#[derive(Debug, Error)]
pub enum TaskError {
    /// A required argument was empty.
    #[error("argument must not be empty: {name}")]
    EmptyArgument {
        /// The argument that was empty.
        name: &'static str,
    },

    /// Too many tasks are already working for this owner.
    #[error("max concurrent tasks reached ({limit})")]
    ConcurrencyLimit {
        /// The configured limit.
        limit: usize,
    },

    /// A generated task ID was already taken.
    #[error("task id collision: {task_id}")]
    IdCollision {
        /// The colliding ID.
        task_id: String,
    },

    /// A configuration value is outside its allowed bounds.
    #[error("invalid task configuration: {field} {reason}")]
    InvalidConfig {
        /// The offending configuration field.
        field: &'static str,
        /// Which bound was violated.
        reason: String,
    },

    /// Background tasks are switched off.
    #[error("async tasks are disabled")]
    Disabled,

    /// The tool cannot run as a background task.
    #[error("tool does not support async execution: {tool_name}")]
    UnsupportedTool {
        /// The rejected tool.
        tool_name: String,
    },
}

impl TaskError {
    /// Maps this error to a JSON-RPC error code.
    ///
    /// - `-32602` (Invalid params): `EmptyArgument`, `UnsupportedTool`
    /// - `-32603` (Internal error): `ConcurrencyLimit`, `IdCollision`,
    ///   `InvalidConfig`, `Disabled`
    pub fn error_code(&self) -> i32 {
        match self {
            Self::EmptyArgument { .. } | Self::UnsupportedTool { .. } => -32602,
            Self::ConcurrencyLimit { .. }
            | Self::IdCollision { .. }
            | Self::InvalidConfig { .. }
            | Self::Disabled => -32603,
        }
    }

    /// Returns `true` for malformed-input errors the caller can correct.
    pub fn is_invalid_argument(&self) -> bool {
        self.error_code() == -32602
    }
}
