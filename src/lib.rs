//! # docmcp
//!
//! Core of an MCP server for document tools: word processing,
//! spreadsheets, presentations, PDF, OCR and barcodes. The document
//! engines themselves live behind [`ToolCapability`](docmcp_tasks::ToolCapability)
//! and the per-family handler catalogs; this crate provides the parts every
//! tool shares.
//!
//! - [`handlers`] - operation dispatch: [`HandlerRegistry`],
//!   [`OperationParameters`] with read-time type coercion, and the
//!   [`OperationContext`] handlers work on.
//! - [`service`] - [`TaskService`], the facade the transport calls for
//!   background (task-augmented) tool calls.
//! - [`config`] - command-line and environment configuration.
//! - `logging` - stderr `tracing` subscriber setup (`logging` feature, on
//!   by default).
//! - [`error`] - the crate [`Error`] with JSON-RPC code mapping.
//!
//! The task subsystem itself (store, executor, cleanup loop) is the
//! [`docmcp_tasks`] crate, re-exported as [`tasks`].

pub mod config;
pub mod error;
pub mod handlers;
#[cfg(feature = "logging")]
pub mod logging;
pub mod service;

pub use docmcp_tasks as tasks;

pub use error::{Error, Result};
pub use handlers::{
    FromParameter, HandlerDescriptor, HandlerRegistry, OperationContext, OperationHandler,
    OperationParameters, Structured,
};
#[cfg(feature = "logging")]
pub use logging::init_logging;
pub use service::TaskService;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::Value;
}
