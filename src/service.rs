//! Protocol-facing facade over the task subsystem.
//!
//! [`TaskService`] is what the MCP transport calls for task-augmented tool
//! calls and the task polling methods. It owns the store, the executor and
//! the cleanup loop, and turns store results into [`TaskStatusPayload`]s
//! or [`Error`]s.

use std::sync::Arc;

use docmcp_tasks::{
    TaskCleanupService, TaskConfig, TaskError, TaskExecutor, TaskStatusPayload, TaskStore,
    ToolCapability,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Background task entry point for the server.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use docmcp::service::TaskService;
/// # use docmcp_tasks::{TaskConfig, ToolCapability};
/// # async fn demo(tools: Arc<dyn ToolCapability>) -> docmcp::Result<()> {
/// let service = TaskService::new(TaskConfig::default(), tools)?;
/// service.start_cleanup();
///
/// let args = serde_json::json!({"path": "report.docx"});
/// let task = service.submit("convert_to_pdf", &args, None, Some("session-1"))?;
/// let status = service.status(&task.task_id, Some("session-1"))?;
/// println!("{}", status.status);
///
/// service.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct TaskService {
    store: Arc<TaskStore>,
    executor: Arc<TaskExecutor>,
    shutdown: CancellationToken,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("config", self.store.config())
            .field("tasks", &self.store.len())
            .field("cleanup_running", &self.cleanup.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl TaskService {
    /// Creates the service with a validated `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Task`] wrapping [`TaskError::InvalidConfig`] when a
    /// bound is violated.
    pub fn new(config: TaskConfig, tools: Arc<dyn ToolCapability>) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(TaskStore::new(config));
        let executor = Arc::new(TaskExecutor::new(Arc::clone(&store), tools));
        Ok(Self {
            store,
            executor,
            shutdown: CancellationToken::new(),
            cleanup: Mutex::new(None),
        })
    }

    /// The validated task configuration.
    pub fn config(&self) -> &TaskConfig {
        self.store.config()
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Creates a task for `tool_name` and schedules it on the runtime.
    ///
    /// Returns the initial status immediately; the outcome is observed by
    /// polling [`status`](Self::status). Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Disabled`] if async tasks are switched off.
    /// - [`TaskError::UnsupportedTool`] if the tool is not async-eligible.
    /// - Any admission error from [`TaskStore::create_task`].
    pub fn submit(
        &self,
        tool_name: &str,
        arguments: &Value,
        ttl_ms: Option<u64>,
        owner_id: Option<&str>,
    ) -> Result<TaskStatusPayload> {
        if !self.config().enabled {
            return Err(TaskError::Disabled.into());
        }
        if !TaskExecutor::supports_async(tool_name) {
            return Err(TaskError::UnsupportedTool {
                tool_name: tool_name.to_string(),
            }
            .into());
        }

        let record = self
            .store
            .create_task(tool_name, arguments, ttl_ms, owner_id)?;
        self.executor.spawn(record.task_id.clone());
        debug!(task_id = %record.task_id, tool = tool_name, "task scheduled");
        Ok(record.to_payload())
    }

    /// Current status of a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if the task does not exist, has been
    /// evicted, or belongs to another owner.
    pub fn status(&self, task_id: &str, owner_id: Option<&str>) -> Result<TaskStatusPayload> {
        self.store
            .get_task(task_id, owner_id)
            .map(|record| record.to_payload())
            .ok_or_else(|| Error::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }

    /// Tasks visible to `owner_id`, newest first.
    pub fn list(&self, owner_id: Option<&str>) -> Vec<TaskStatusPayload> {
        self.store
            .list_tasks(owner_id)
            .iter()
            .map(|record| record.to_payload())
            .collect()
    }

    /// Cancels a task and returns its new status.
    ///
    /// # Errors
    ///
    /// - [`Error::TaskNotFound`] if the task is not visible to `owner_id`.
    /// - [`Error::InvalidOperation`] if the task already finished.
    pub fn cancel(&self, task_id: &str, owner_id: Option<&str>) -> Result<TaskStatusPayload> {
        if self.store.cancel_task(task_id, owner_id) {
            return self.status(task_id, owner_id);
        }
        match self.store.get_task(task_id, owner_id) {
            Some(record) => Err(Error::invalid_operation(format!(
                "task {task_id} cannot be cancelled, it is already {}",
                record.status
            ))),
            None => Err(Error::TaskNotFound {
                task_id: task_id.to_string(),
            }),
        }
    }

    /// Starts the periodic eviction loop.
    ///
    /// Returns `false` if it is already running or the service was shut
    /// down. Must be called from within a tokio runtime.
    pub fn start_cleanup(&self) -> bool {
        let mut cleanup = self.cleanup.lock();
        if cleanup.is_some() || self.shutdown.is_cancelled() {
            return false;
        }
        let service =
            TaskCleanupService::new(Arc::clone(&self.store), self.config().cleanup_interval());
        *cleanup = Some(service.spawn(self.shutdown.child_token()));
        true
    }

    /// Stops the cleanup loop and waits for it to exit.
    ///
    /// Running tasks are not interrupted; their state is dropped with the
    /// service.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.cleanup.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "cleanup loop ended abnormally");
            }
        }
        info!(remaining = self.store.len(), "task service stopped");
    }
}
