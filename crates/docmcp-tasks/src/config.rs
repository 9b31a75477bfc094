//! Limits and intervals for the task subsystem.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Lower bound for `max_concurrent_tasks`.
pub const MIN_CONCURRENT_TASKS: usize = 1;

/// Upper bound for `max_concurrent_tasks`.
pub const MAX_CONCURRENT_TASKS: usize = 100;

/// Lower bound for TTLs and the cleanup interval, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 1000;

/// Configuration for background task execution.
///
/// Values come from the command line or environment (see the server
/// binary); whatever the source, [`validate`](Self::validate) must pass
/// before the config is handed to a store or cleanup service.
///
/// # Defaults
///
/// | Setting                    | Default    | Description                           |
/// |----------------------------|------------|---------------------------------------|
/// | `enabled`                  | true       | Whether async tasks are accepted      |
/// | `max_concurrent_tasks`     | 10         | Working tasks per owner (1-100)       |
/// | `default_ttl_ms`           | 3,600,000  | 1 hour                                |
/// | `max_ttl_ms`               | 86,400,000 | 24 hours                              |
/// | `default_poll_interval_ms` | 2,000      | Suggested polling interval            |
/// | `cleanup_interval_ms`      | 60,000     | Eviction sweep period                 |
///
/// # Examples
///
/// ```
/// use docmcp_tasks::TaskConfig;
///
/// let config = TaskConfig::default();
/// assert!(config.validate().is_ok());
///
/// let config = TaskConfig { max_concurrent_tasks: 0, ..TaskConfig::default() };
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Whether async task submission is enabled.
    pub enabled: bool,

    /// Maximum number of working tasks per owner (or globally for
    /// anonymous submissions).
    pub max_concurrent_tasks: usize,

    /// TTL applied when the caller does not request one.
    pub default_ttl_ms: u64,

    /// Upper bound for any TTL; larger requests are clamped.
    pub max_ttl_ms: u64,

    /// Polling interval suggested to clients.
    pub default_poll_interval_ms: u64,

    /// Period of the eviction sweep.
    pub cleanup_interval_ms: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_tasks: 10,
            default_ttl_ms: 3_600_000,
            max_ttl_ms: 86_400_000,
            default_poll_interval_ms: 2_000,
            cleanup_interval_ms: 60_000,
        }
    }
}

impl TaskConfig {
    /// Checks every bound, reporting the first offending field.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidConfig`] naming the field when
    /// `max_concurrent_tasks` is outside 1-100, `default_ttl_ms` or
    /// `cleanup_interval_ms` is below 1000, or `max_ttl_ms` is below
    /// `default_ttl_ms`.
    pub fn validate(&self) -> Result<(), TaskError> {
        if !(MIN_CONCURRENT_TASKS..=MAX_CONCURRENT_TASKS).contains(&self.max_concurrent_tasks) {
            return Err(TaskError::InvalidConfig {
                field: "max_concurrent_tasks",
                reason: format!(
                    "must be between {MIN_CONCURRENT_TASKS} and {MAX_CONCURRENT_TASKS} (got {})",
                    self.max_concurrent_tasks
                ),
            });
        }
        if self.default_ttl_ms < MIN_INTERVAL_MS {
            return Err(TaskError::InvalidConfig {
                field: "default_ttl_ms",
                reason: format!(
                    "must be at least {MIN_INTERVAL_MS} (got {})",
                    self.default_ttl_ms
                ),
            });
        }
        if self.max_ttl_ms < self.default_ttl_ms {
            return Err(TaskError::InvalidConfig {
                field: "max_ttl_ms",
                reason: format!(
                    "must be at least default_ttl_ms {} (got {})",
                    self.default_ttl_ms, self.max_ttl_ms
                ),
            });
        }
        if self.cleanup_interval_ms < MIN_INTERVAL_MS {
            return Err(TaskError::InvalidConfig {
                field: "cleanup_interval_ms",
                reason: format!(
                    "must be at least {MIN_INTERVAL_MS} (got {})",
                    self.cleanup_interval_ms
                ),
            });
        }
        Ok(())
    }

    /// Returns the TTL for a task that requested `requested` milliseconds.
    ///
    /// Falls back to the default when nothing was requested and never
    /// exceeds the configured maximum.
    pub fn effective_ttl(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_ttl_ms)
            .min(self.max_ttl_ms)
    }

    /// The cleanup period as a [`Duration`].
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}
