//! Background task execution for the docmcp document tool server.
//!
//! Long-running document tools (conversions) do not block the request that
//! started them. Instead the caller creates a task, the executor runs the
//! tool out of band, and clients poll the task for its status and result.
//!
//! # Overview
//!
//! A task progresses through a small state machine
//! (`working` -> `completed`/`failed`/`cancelled`, with `input_required`
//! reserved for interactive flows). Terminal tasks are kept for their TTL so
//! that clients can collect the outcome, then evicted by the cleanup sweep.
//!
//! # Module Organization
//!
//! - [`types`] - Task status and the status payload returned to pollers
//! - [`domain`] - [`TaskRecord`], the store's internal representation
//! - [`store`] - [`TaskStore`], the concurrent in-memory registry
//! - [`executor`] - [`TaskExecutor`] and the [`ToolCapability`] seam
//! - [`cleanup`] - [`TaskCleanupService`], the periodic eviction loop
//! - [`config`] - [`TaskConfig`] limits and intervals
//! - [`error`] - [`TaskError`] with JSON-RPC error code mapping
//! - [`constants`] - Async tool allow-list and status messages

pub mod cleanup;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod executor;
pub mod store;
pub mod types;

pub use cleanup::TaskCleanupService;
pub use config::TaskConfig;
pub use constants::*;
pub use domain::TaskRecord;
pub use error::TaskError;
pub use executor::{AsyncTool, TaskExecutor, ToolCapability, ToolFault};
pub use store::TaskStore;
pub use types::*;
