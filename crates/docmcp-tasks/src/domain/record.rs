//! Task record -- the store's internal representation of a task.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::constants::MSG_CREATED;
use crate::types::task::{TaskStatus, TaskStatusPayload};

/// Internal storage representation of a background task.
///
/// Records are owned by the [`TaskStore`](crate::store::TaskStore) and only
/// change through its update and cancel operations. Clones handed out by the
/// store are snapshots; they share the cancellation handle with the stored
/// record, so cancelling through a snapshot's token is observed by the
/// executor.
///
/// `result` and `error_message` are never both set. Once the task is
/// terminal exactly one of them is set, except for `Cancelled`, which may
/// carry neither.
///
/// # Examples
///
/// ```
/// use docmcp_tasks::domain::TaskRecord;
/// use docmcp_tasks::TaskStatus;
/// use serde_json::json;
///
/// let record = TaskRecord::new("convert_to_pdf", &json!({"path": "a.docx"}), 60_000, 2000, None);
/// assert_eq!(record.status, TaskStatus::Working);
/// assert_eq!(record.task_id.len(), 32);
/// assert!(record.result.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Unique task identifier (UUID v4, simple form).
    pub task_id: String,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Human-readable status message.
    pub status_message: Option<String>,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Time of the last update, the reference point for TTL eviction.
    pub last_updated_at: DateTime<Utc>,

    /// When an executor claimed the task; `None` until then.
    pub started_at: Option<DateTime<Utc>>,

    /// How long a terminal task is retained, in milliseconds.
    pub ttl_ms: u64,

    /// Suggested polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// The tool this task runs.
    pub tool_name: String,

    /// Private copy of the caller's arguments.
    pub arguments: Value,

    /// Tool output, set on completion.
    pub result: Option<Value>,

    /// Failure detail, set on failure.
    pub error_message: Option<String>,

    /// Identity of the owner, if the task is owner-scoped.
    pub owner_id: Option<String>,

    /// Creation order within the store, used to break timestamp ties.
    pub(crate) sequence: u64,

    cancellation: CancellationToken,
}

impl TaskRecord {
    /// Creates a new record in the `Working` state with a fresh ID.
    ///
    /// `arguments` is deep-copied so later changes to the caller's value do
    /// not reach the task.
    pub fn new(
        tool_name: &str,
        arguments: &Value,
        ttl_ms: u64,
        poll_interval_ms: u64,
        owner_id: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4().simple().to_string(),
            status: TaskStatus::Working,
            status_message: Some(MSG_CREATED.to_string()),
            created_at: now,
            last_updated_at: now,
            started_at: None,
            ttl_ms,
            poll_interval_ms,
            tool_name: tool_name.to_string(),
            arguments: arguments.clone(),
            result: None,
            error_message: None,
            owner_id: owner_id.map(str::to_string),
            sequence: 0,
            cancellation: CancellationToken::new(),
        }
    }

    /// Returns `true` if the task reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns `true` if the record may be evicted at `now`.
    ///
    /// Only terminal tasks expire; a task that is still working is kept no
    /// matter how old it is.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_terminal() {
            return false;
        }
        let idle_ms = (now - self.last_updated_at).num_milliseconds();
        let ttl_ms = i64::try_from(self.ttl_ms).unwrap_or(i64::MAX);
        idle_ms > ttl_ms
    }

    /// Returns `true` if the record belongs to `owner_id`.
    ///
    /// A `None` filter matches every record.
    pub fn is_visible_to(&self, owner_id: Option<&str>) -> bool {
        match owner_id {
            Some(owner) => self.owner_id.as_deref() == Some(owner),
            None => true,
        }
    }

    /// Returns a handle to the task's cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn request_cancellation(&self) {
        self.cancellation.cancel();
    }

    /// Builds the client-facing status payload.
    pub fn to_payload(&self) -> TaskStatusPayload {
        TaskStatusPayload {
            task_id: self.task_id.clone(),
            status: self.status,
            status_message: self.status_message.clone(),
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            last_updated_at: self
                .last_updated_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            ttl: self.ttl_ms,
            poll_interval: self.poll_interval_ms,
            tool_name: self.tool_name.clone(),
            result: self.result.clone(),
            error: self.error_message.clone(),
        }
    }
}
