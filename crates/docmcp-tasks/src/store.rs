//! Concurrent in-memory task store.
//!
//! [`TaskStore`] keeps every [`TaskRecord`] in a [`DashMap`] keyed by task
//! ID. Reads, updates, cancellation and the eviction sweep rely on the
//! map's shard locking alone. Admission in [`create_task`](TaskStore::create_task)
//! additionally holds a store-wide mutex so that counting working tasks and
//! inserting the new one happen as one step.
//!
//! # Owner Isolation
//!
//! Operations that take an `owner_id` only see records created with that
//! owner. A mismatch looks exactly like a missing task, so one owner cannot
//! probe for another owner's task IDs.
//!
//! # Examples
//!
//! ```
//! use docmcp_tasks::{TaskConfig, TaskStatus, TaskStore};
//! use serde_json::json;
//!
//! let store = TaskStore::new(TaskConfig::default());
//! let record = store
//!     .create_task("convert_to_pdf", &json!({"path": "in.docx"}), None, Some("alice"))
//!     .unwrap();
//!
//! assert!(store.get_task(&record.task_id, Some("alice")).is_some());
//! assert!(store.get_task(&record.task_id, Some("bob")).is_none());
//!
//! assert!(store.cancel_task(&record.task_id, Some("alice")));
//! let cancelled = store.get_task(&record.task_id, None).unwrap();
//! assert_eq!(cancelled.status, TaskStatus::Cancelled);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::TaskConfig;
use crate::constants::{MSG_CANCELLED, MSG_PROCESSING};
use crate::domain::TaskRecord;
use crate::error::TaskError;
use crate::types::task::TaskStatus;

/// Thread-safe registry of background tasks.
#[derive(Debug)]
pub struct TaskStore {
    tasks: DashMap<String, TaskRecord>,
    admission: Mutex<()>,
    sequence: AtomicU64,
    config: TaskConfig,
}

impl TaskStore {
    /// Creates an empty store governed by `config`.
    ///
    /// The config is expected to have passed
    /// [`TaskConfig::validate`]; the store does not re-check it.
    pub fn new(config: TaskConfig) -> Self {
        Self {
            tasks: DashMap::new(),
            admission: Mutex::new(()),
            sequence: AtomicU64::new(0),
            config,
        }
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Creates a new `Working` task for `tool_name`.
    ///
    /// The TTL is `min(ttl_ms or the default, max_ttl_ms)`. `arguments` is
    /// deep-copied into the record.
    ///
    /// # Errors
    ///
    /// - [`TaskError::EmptyArgument`] if `tool_name` is empty.
    /// - [`TaskError::ConcurrencyLimit`] if the owner (or, without an owner,
    ///   the whole store) already has `max_concurrent_tasks` working tasks.
    /// - [`TaskError::IdCollision`] if the generated ID is already in use.
    pub fn create_task(
        &self,
        tool_name: &str,
        arguments: &Value,
        ttl_ms: Option<u64>,
        owner_id: Option<&str>,
    ) -> Result<TaskRecord, TaskError> {
        if tool_name.is_empty() {
            return Err(TaskError::EmptyArgument { name: "tool_name" });
        }

        let ttl_ms = self.config.effective_ttl(ttl_ms);
        let _admission = self.admission.lock();

        let active = self.active_count(owner_id);
        if active >= self.config.max_concurrent_tasks {
            warn!(
                owner = owner_id.unwrap_or("-"),
                active,
                limit = self.config.max_concurrent_tasks,
                "rejecting task: max concurrent tasks reached"
            );
            return Err(TaskError::ConcurrencyLimit {
                limit: self.config.max_concurrent_tasks,
            });
        }

        let mut record = TaskRecord::new(
            tool_name,
            arguments,
            ttl_ms,
            self.config.default_poll_interval_ms,
            owner_id,
        );
        record.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        match self.tasks.entry(record.task_id.clone()) {
            // The orphaned record (and its token) is dropped here.
            Entry::Occupied(_) => Err(TaskError::IdCollision {
                task_id: record.task_id,
            }),
            Entry::Vacant(slot) => {
                info!(task_id = %record.task_id, tool = tool_name, ttl_ms, "task created");
                Ok(slot.insert(record).clone())
            }
        }
    }

    /// Returns a snapshot of the task, or `None` if it does not exist or
    /// belongs to a different owner.
    pub fn get_task(&self, task_id: &str, owner_id: Option<&str>) -> Option<TaskRecord> {
        self.tasks
            .get(task_id)
            .filter(|entry| entry.is_visible_to(owner_id))
            .map(|entry| entry.value().clone())
    }

    /// Lists tasks visible to `owner_id`, newest first.
    pub fn list_tasks(&self, owner_id: Option<&str>) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> = self
            .tasks
            .iter()
            .filter(|entry| entry.is_visible_to(owner_id))
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.sequence.cmp(&a.sequence))
        });
        tasks
    }

    /// Applies a partial update to a task.
    ///
    /// `message` replaces the status message when given. A move to a
    /// terminal status must carry the matching outcome: `Completed` needs a
    /// `result` and no error, `Failed` needs an `error_message` (which wins
    /// over a `result`), and `Cancelled` records neither.
    ///
    /// Once a task is terminal its status, message and outcome are fixed.
    /// Repeating the same status is accepted, and only refreshes
    /// `last_updated_at`, if it supplies no outcome or the stored one.
    ///
    /// Returns `false` if the task does not exist or the update is refused.
    pub fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: Option<String>,
        result: Option<Value>,
        error_message: Option<String>,
    ) -> bool {
        let Some(mut entry) = self.tasks.get_mut(task_id) else {
            debug!(task_id, %status, "update for unknown task ignored");
            return false;
        };
        let record = entry.value_mut();

        if !record.status.accepts(status) {
            debug!(
                task_id,
                from = %record.status,
                to = %status,
                "update of terminal task rejected"
            );
            return false;
        }

        if record.is_terminal() {
            let repeats = (result.is_none() && error_message.is_none())
                || terminal_outcome(status, result, error_message).is_some_and(
                    |(result, error)| result == record.result && error == record.error_message,
                );
            if !repeats {
                debug!(task_id, %status, "conflicting outcome for finished task rejected");
                return false;
            }
            record.last_updated_at = Utc::now();
            return true;
        }

        if status.is_terminal() {
            let Some((result, error)) = terminal_outcome(status, result, error_message) else {
                debug!(task_id, %status, "terminal update without a matching outcome rejected");
                return false;
            };
            record.result = result;
            record.error_message = error;
        }

        record.status = status;
        if message.is_some() {
            record.status_message = message;
        }
        record.last_updated_at = Utc::now();
        true
    }

    /// Claims a working task for execution.
    ///
    /// Sets `started_at`, moves the message to "Processing..." and returns
    /// the claimed snapshot. Returns `None` if the task is missing, no longer
    /// `Working`, cancelled, or already claimed, so at most one executor
    /// ever runs a task.
    pub fn start_task(&self, task_id: &str) -> Option<TaskRecord> {
        let mut entry = self.tasks.get_mut(task_id)?;
        let record = entry.value_mut();
        if record.status != TaskStatus::Working
            || record.is_cancellation_requested()
            || record.started_at.is_some()
        {
            debug!(task_id, status = %record.status, "task not claimable");
            return None;
        }

        let now = Utc::now();
        record.started_at = Some(now);
        record.status_message = Some(MSG_PROCESSING.to_string());
        record.last_updated_at = now;
        Some(record.clone())
    }

    /// Cancels a task that has not finished yet.
    ///
    /// Signals the task's cancellation token and moves it to `Cancelled`.
    /// Returns `false` if the task is missing, owned by someone else, or
    /// already terminal; its state is left untouched in that case.
    pub fn cancel_task(&self, task_id: &str, owner_id: Option<&str>) -> bool {
        let Some(mut entry) = self.tasks.get_mut(task_id) else {
            return false;
        };
        let record = entry.value_mut();
        if !record.is_visible_to(owner_id) || record.is_terminal() {
            return false;
        }

        record.request_cancellation();
        record.status = TaskStatus::Cancelled;
        record.status_message = Some(MSG_CANCELLED.to_string());
        record.result = None;
        record.error_message = None;
        record.last_updated_at = Utc::now();
        info!(task_id, "task cancelled");
        true
    }

    /// Evicts terminal tasks whose TTL has elapsed since their last update.
    ///
    /// Working tasks are never evicted, whatever their age. Returns the
    /// number of records removed.
    pub fn cleanup_expired_tasks(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .tasks
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = expired
            .iter()
            .filter(|task_id| {
                self.tasks
                    .remove_if(task_id.as_str(), |_, record| record.is_expired_at(now))
                    .is_some()
            })
            .count();

        if removed > 0 {
            info!(removed, remaining = self.tasks.len(), "expired tasks evicted");
        }
        removed
    }

    /// Removes every task.
    pub fn clear(&self) {
        let count = self.tasks.len();
        self.tasks.clear();
        debug!(count, "task store cleared");
    }

    /// Number of working tasks visible to `owner_id`.
    pub fn active_count(&self, owner_id: Option<&str>) -> usize {
        self.tasks
            .iter()
            .filter(|entry| entry.status == TaskStatus::Working && entry.is_visible_to(owner_id))
            .count()
    }

    /// Number of tasks in the store.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the store holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn with_record<R>(
        &self,
        task_id: &str,
        f: impl FnOnce(&mut TaskRecord) -> R,
    ) -> Option<R> {
        self.tasks.get_mut(task_id).map(|mut entry| f(entry.value_mut()))
    }
}

/// Resolves the `(result, error_message)` pair a terminal `status` leaves on
/// a record, or `None` if the supplied outcome does not fit the status.
fn terminal_outcome(
    status: TaskStatus,
    result: Option<Value>,
    error_message: Option<String>,
) -> Option<(Option<Value>, Option<String>)> {
    match status {
        TaskStatus::Completed => match (result, error_message) {
            (Some(result), None) => Some((Some(result), None)),
            _ => None,
        },
        TaskStatus::Failed => error_message.map(|error| (None, Some(error))),
        TaskStatus::Cancelled | TaskStatus::Working | TaskStatus::InputRequired => {
            Some((None, None))
        }
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(TaskConfig::default())
    }
}
