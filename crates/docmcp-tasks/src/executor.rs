//! Runs background tasks against the document tool capability.
//!
//! [`TaskExecutor`] is the fault boundary of the task subsystem: whatever
//! the tool does, the outcome ends up as a terminal status on the task and
//! nothing propagates to the code that scheduled it.
//!
//! # Outcome mapping
//!
//! | Outcome                  | Status      | Message                          |
//! |--------------------------|-------------|----------------------------------|
//! | cancellation requested   | `Cancelled` | "Task was cancelled"             |
//! | [`ToolFault::NotFound`]  | `Failed`    | "File not found"                 |
//! | [`ToolFault::AccessDenied`] | `Failed` | "Access denied"                  |
//! | [`ToolFault::InvalidArgument`] | `Failed` | "Invalid argument"          |
//! | [`ToolFault::NotSupported`] | `Failed` | "Not supported"                  |
//! | anything else            | `Failed`    | "Task failed"                    |
//! | success                  | `Completed` | "Task completed successfully"    |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::constants::{
    ASYNC_TOOLS, MSG_ACCESS_DENIED, MSG_CANCELLED, MSG_COMPLETED, MSG_FAILED, MSG_FILE_NOT_FOUND,
    MSG_INVALID_ARGUMENT, MSG_NOT_SUPPORTED, OUTPUT_PATH_ARGUMENT,
};
use crate::domain::TaskRecord;
use crate::store::TaskStore;
use crate::types::task::TaskStatus;

/// Faults a document tool can raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolFault {
    /// An input file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The tool was denied access to a path.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The arguments were malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The tool cannot run in this mode.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The tool observed cancellation and stopped.
    #[error("operation cancelled")]
    Cancelled,

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl ToolFault {
    /// The status message recorded on a task that failed with this fault.
    pub fn status_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => MSG_FILE_NOT_FOUND,
            Self::AccessDenied(_) => MSG_ACCESS_DENIED,
            Self::InvalidArgument(_) => MSG_INVALID_ARGUMENT,
            Self::NotSupported(_) => MSG_NOT_SUPPORTED,
            Self::Cancelled => MSG_CANCELLED,
            Self::Other(_) => MSG_FAILED,
        }
    }
}

/// The external document tool capability.
///
/// Implemented by the layer that owns the document SDKs. The executor calls
/// it on a spawned tokio task; long conversions should check `cancel` and
/// return [`ToolFault::Cancelled`] when it fires.
#[async_trait]
pub trait ToolCapability: Send + Sync {
    /// Runs `tool_name` with `arguments`, writing to `output_path` when the
    /// caller overrides the destination.
    async fn execute(
        &self,
        tool_name: &str,
        arguments: Value,
        output_path: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFault>;
}

/// Tools the executor knows how to dispatch.
///
/// Mirrors [`ASYNC_TOOLS`]; a tool needs both an allow-list entry and a
/// variant here to run in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncTool {
    /// Convert a document to PDF.
    ConvertToPdf,
    /// Convert a document between formats.
    ConvertDocument,
}

impl AsyncTool {
    /// Looks up the dispatch entry for `tool_name`.
    pub fn from_name(tool_name: &str) -> Option<Self> {
        match tool_name {
            "convert_to_pdf" => Some(Self::ConvertToPdf),
            "convert_document" => Some(Self::ConvertDocument),
            _ => None,
        }
    }

    /// The tool name passed to the capability.
    pub fn name(self) -> &'static str {
        match self {
            Self::ConvertToPdf => "convert_to_pdf",
            Self::ConvertDocument => "convert_document",
        }
    }

    fn output_path(self, arguments: &Value) -> Option<String> {
        arguments
            .get(OUTPUT_PATH_ARGUMENT)
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }
}

/// Runs tasks from a [`TaskStore`] to completion.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use docmcp_tasks::{TaskConfig, TaskExecutor, TaskStore, ToolCapability};
/// # async fn demo(tools: Arc<dyn ToolCapability>) {
/// let store = Arc::new(TaskStore::new(TaskConfig::default()));
/// let executor = Arc::new(TaskExecutor::new(store.clone(), tools));
///
/// let args = serde_json::json!({"path": "report.docx", "outputPath": "report.pdf"});
/// let record = store.create_task("convert_to_pdf", &args, None, None).unwrap();
/// executor.spawn(record.task_id.clone());
/// // Poll `store.get_task(..)` for the outcome.
/// # }
/// ```
pub struct TaskExecutor {
    store: Arc<TaskStore>,
    tools: Arc<dyn ToolCapability>,
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("tasks", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl TaskExecutor {
    /// Creates an executor that runs tasks from `store` through `tools`.
    pub fn new(store: Arc<TaskStore>, tools: Arc<dyn ToolCapability>) -> Self {
        Self { store, tools }
    }

    /// Returns `true` if `tool_name` may run as a background task.
    ///
    /// Callers must check this before creating a task for the tool.
    pub fn supports_async(tool_name: &str) -> bool {
        ASYNC_TOOLS.contains(&tool_name)
    }

    /// Schedules [`execute`](Self::execute) on the tokio runtime and returns
    /// immediately.
    pub fn spawn(self: &Arc<Self>, task_id: impl Into<String>) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        let task_id = task_id.into();
        tokio::spawn(async move { executor.execute(&task_id).await })
    }

    /// Runs the task to a terminal state.
    ///
    /// Returns quietly if the task no longer exists (it may have been
    /// evicted between scheduling and running), is already terminal, or
    /// cannot be claimed through [`TaskStore::start_task`]. The tool is
    /// only called after a successful claim.
    pub async fn execute(&self, task_id: &str) {
        let Some(record) = self.store.get_task(task_id, None) else {
            warn!(task_id, "task not found, it may have expired before running");
            return;
        };
        if record.is_terminal() {
            debug!(task_id, status = %record.status, "task already finished, skipping");
            return;
        }

        if record.is_cancellation_requested() {
            self.finish(&record, Err(ToolFault::Cancelled));
            return;
        }

        let Some(record) = self.store.start_task(task_id) else {
            debug!(task_id, "task was cancelled, removed or claimed by another run, skipping");
            return;
        };
        let cancel = record.cancellation_token();
        debug!(task_id, tool = %record.tool_name, "task started");

        let outcome = self.invoke(&record, &cancel).await;
        let outcome = if cancel.is_cancelled() {
            Err(ToolFault::Cancelled)
        } else {
            outcome
        };
        self.finish(&record, outcome);
    }

    async fn invoke(
        &self,
        record: &TaskRecord,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolFault> {
        let Some(tool) = AsyncTool::from_name(&record.tool_name) else {
            return Err(ToolFault::NotSupported(format!(
                "tool '{}' does not support async execution",
                record.tool_name
            )));
        };

        if cancel.is_cancelled() {
            return Err(ToolFault::Cancelled);
        }

        let tools = Arc::clone(&self.tools);
        let arguments = record.arguments.clone();
        let output_path = tool.output_path(&arguments);
        let tool_cancel = cancel.clone();
        let mut handle = tokio::spawn(async move {
            tools
                .execute(tool.name(), arguments, output_path, tool_cancel)
                .await
        });

        tokio::select! {
            () = cancel.cancelled() => {
                handle.abort();
                Err(ToolFault::Cancelled)
            }
            joined = &mut handle => match joined {
                Ok(outcome) => outcome,
                Err(err) if err.is_cancelled() => Err(ToolFault::Cancelled),
                Err(err) => Err(ToolFault::Other(format!("tool invocation panicked: {err}"))),
            },
        }
    }

    fn finish(&self, record: &TaskRecord, outcome: Result<Value, ToolFault>) {
        let task_id = record.task_id.as_str();
        let tool = record.tool_name.as_str();

        let (status, message, result, error_message) = match outcome {
            Ok(result) => {
                info!(task_id, tool, "task completed");
                (TaskStatus::Completed, MSG_COMPLETED, Some(result), None)
            }
            Err(ToolFault::Cancelled) => {
                info!(task_id, tool, "task cancelled");
                (TaskStatus::Cancelled, MSG_CANCELLED, None, None)
            }
            Err(fault @ ToolFault::NotFound(_)) => {
                warn!(task_id, tool, %fault, "task failed: file not found");
                (TaskStatus::Failed, fault.status_message(), None, Some(fault.to_string()))
            }
            Err(fault @ (ToolFault::AccessDenied(_)
            | ToolFault::InvalidArgument(_)
            | ToolFault::NotSupported(_))) => {
                warn!(task_id, tool, %fault, "task failed");
                (TaskStatus::Failed, fault.status_message(), None, Some(fault.to_string()))
            }
            Err(fault @ ToolFault::Other(_)) => {
                error!(task_id, tool, %fault, "task failed");
                (TaskStatus::Failed, fault.status_message(), None, Some(fault.to_string()))
            }
        };

        if !self.store.update_task_status(
            task_id,
            status,
            Some(message.to_string()),
            result,
            error_message,
        ) {
            debug!(task_id, %status, "outcome not recorded, task was removed or already finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatch_table_matches_allow_list() {
        for name in ASYNC_TOOLS {
            let tool = AsyncTool::from_name(name).expect("allow-listed tool must dispatch");
            assert_eq!(tool.name(), *name);
            assert!(TaskExecutor::supports_async(name));
        }
        assert!(AsyncTool::from_name("add_bookmark").is_none());
        assert!(!TaskExecutor::supports_async("add_bookmark"));
    }

    #[test]
    fn output_path_override_is_read_from_arguments() {
        let tool = AsyncTool::ConvertToPdf;
        assert_eq!(
            tool.output_path(&json!({"outputPath": "out.pdf"})).as_deref(),
            Some("out.pdf")
        );
        assert_eq!(tool.output_path(&json!({"outputPath": ""})), None);
        assert_eq!(tool.output_path(&json!({"path": "in.docx"})), None);
    }

    #[test]
    fn fault_messages() {
        assert_eq!(
            ToolFault::NotFound("a.docx".into()).status_message(),
            MSG_FILE_NOT_FOUND
        );
        assert_eq!(ToolFault::Other("boom".into()).status_message(), MSG_FAILED);
        assert_eq!(ToolFault::Other("boom".into()).to_string(), "boom");
    }
}
