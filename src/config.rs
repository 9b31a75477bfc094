//! Command-line and environment configuration for a server embedding the
//! task runtime.
//!
//! Every [`TaskConfig`] field has a long flag and a `DOCMCP_*` environment
//! variable. A flag wins over the environment, which wins over the
//! default.
//!
//! | Flag                     | Environment                       |
//! |--------------------------|-----------------------------------|
//! | `--tasks-enabled`        | `DOCMCP_TASKS_ENABLED`            |
//! | `--max-concurrent-tasks` | `DOCMCP_MAX_CONCURRENT_TASKS`     |
//! | `--default-ttl-ms`       | `DOCMCP_TASK_DEFAULT_TTL_MS`      |
//! | `--max-ttl-ms`           | `DOCMCP_TASK_MAX_TTL_MS`          |
//! | `--poll-interval-ms`     | `DOCMCP_TASK_POLL_INTERVAL_MS`    |
//! | `--cleanup-interval-ms`  | `DOCMCP_TASK_CLEANUP_INTERVAL_MS` |

use clap::{ArgAction, Parser};
use docmcp_tasks::TaskConfig;

use crate::error::Result;

/// Task runtime settings for a document tool MCP server
#[derive(Debug, Clone, Parser)]
#[command(name = "docmcp")]
#[command(about = "MCP server for document tools with background task support", long_about = None)]
#[command(version)]
pub struct ServerArgs {
    /// Accept task-augmented (background) tool calls
    #[arg(
        long,
        env = "DOCMCP_TASKS_ENABLED",
        default_value_t = TaskConfig::default().enabled,
        action = ArgAction::Set
    )]
    pub tasks_enabled: bool,

    /// Working tasks allowed per owner (1-100)
    #[arg(long, env = "DOCMCP_MAX_CONCURRENT_TASKS", default_value_t = TaskConfig::default().max_concurrent_tasks)]
    pub max_concurrent_tasks: usize,

    /// Retention of finished tasks when the caller requests none, in milliseconds
    #[arg(long, env = "DOCMCP_TASK_DEFAULT_TTL_MS", default_value_t = TaskConfig::default().default_ttl_ms)]
    pub default_ttl_ms: u64,

    /// Upper bound for requested retention, in milliseconds
    #[arg(long, env = "DOCMCP_TASK_MAX_TTL_MS", default_value_t = TaskConfig::default().max_ttl_ms)]
    pub max_ttl_ms: u64,

    /// Polling interval suggested to clients, in milliseconds
    #[arg(long, env = "DOCMCP_TASK_POLL_INTERVAL_MS", default_value_t = TaskConfig::default().default_poll_interval_ms)]
    pub poll_interval_ms: u64,

    /// Period of the expired-task sweep, in milliseconds
    #[arg(long, env = "DOCMCP_TASK_CLEANUP_INTERVAL_MS", default_value_t = TaskConfig::default().cleanup_interval_ms)]
    pub cleanup_interval_ms: u64,
}

impl ServerArgs {
    /// The task configuration described by these arguments, unvalidated.
    pub fn task_config(&self) -> TaskConfig {
        TaskConfig {
            enabled: self.tasks_enabled,
            max_concurrent_tasks: self.max_concurrent_tasks,
            default_ttl_ms: self.default_ttl_ms,
            max_ttl_ms: self.max_ttl_ms,
            default_poll_interval_ms: self.poll_interval_ms,
            cleanup_interval_ms: self.cleanup_interval_ms,
        }
    }

    /// The task configuration, checked against its bounds.
    ///
    /// # Errors
    ///
    /// Returns the first violated bound as a task configuration error.
    pub fn validated_task_config(&self) -> Result<TaskConfig> {
        let config = self.task_config();
        config.validate()?;
        Ok(config)
    }
}
