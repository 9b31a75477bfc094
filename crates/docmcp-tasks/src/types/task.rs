//! Task lifecycle status and the status payload.
//!
//! # Serialization
//!
//! [`TaskStatusPayload`] uses `#[serde(rename_all = "camelCase")]` so the
//! protocol layer can embed it in a response as-is. Timestamps are RFC 3339
//! with millisecond precision.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Task lifecycle status.
///
/// # State Machine
///
/// ```text
/// Working -> InputRequired, Completed, Failed, Cancelled
/// Completed -> (terminal)
/// Failed -> (terminal)
/// Cancelled -> (terminal)
/// ```
///
/// A task is created directly in `Working`; there is no pending state.
/// `InputRequired` is reserved for interactive flows and is not produced by
/// the executor.
///
/// # Examples
///
/// ```
/// use docmcp_tasks::TaskStatus;
///
/// assert!(!TaskStatus::Working.is_terminal());
/// assert!(TaskStatus::Working.accepts(TaskStatus::Completed));
/// assert!(!TaskStatus::Completed.accepts(TaskStatus::Working));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is running (or about to run).
    Working,
    /// Task is waiting for input from the client.
    InputRequired,
    /// Task completed successfully (terminal).
    Completed,
    /// Task failed (terminal).
    Failed,
    /// Task was cancelled (terminal).
    Cancelled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Working => write!(f, "working"),
            Self::InputRequired => write!(f, "input_required"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl TaskStatus {
    /// Returns `true` if this status is terminal.
    ///
    /// Terminal states are `Completed`, `Failed`, and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` if a record in this status may be updated to `next`.
    ///
    /// Non-terminal statuses accept any update, including a refresh of the
    /// same status. A terminal status only accepts itself again, which makes
    /// re-applying a terminal outcome idempotent.
    pub fn accepts(&self, next: Self) -> bool {
        !self.is_terminal() || *self == next
    }
}

/// Task status as reported to polling clients.
///
/// Once the task is terminal, at most one of `result` and `error` is
/// present. Both are omitted while the task is still working.
///
/// # Examples
///
/// ```
/// use docmcp_tasks::{TaskStatus, TaskStatusPayload};
///
/// let payload = TaskStatusPayload {
///     task_id: "3f2a".to_string(),
///     status: TaskStatus::Working,
///     status_message: Some("Processing...".to_string()),
///     created_at: "2026-01-05T10:30:00.000Z".to_string(),
///     last_updated_at: "2026-01-05T10:30:01.000Z".to_string(),
///     ttl: 3_600_000,
///     poll_interval: 2000,
///     tool_name: "convert_to_pdf".to_string(),
///     result: None,
///     error: None,
/// };
///
/// let json = serde_json::to_value(&payload).unwrap();
/// assert_eq!(json["taskId"], "3f2a");
/// assert_eq!(json["status"], "working");
/// assert!(json.get("result").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusPayload {
    /// Unique identifier of the task.
    pub task_id: String,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Human-readable status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    /// RFC 3339 timestamp when the task was created.
    pub created_at: String,

    /// RFC 3339 timestamp of the last update.
    pub last_updated_at: String,

    /// Result retention in milliseconds after the task turns terminal.
    pub ttl: u64,

    /// Suggested polling interval in milliseconds.
    pub poll_interval: u64,

    /// Tool the task runs.
    pub tool_name: String,

    /// Tool output, present once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Failure detail, present once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
