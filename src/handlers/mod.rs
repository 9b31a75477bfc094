//! Operation dispatch for document tools.
//!
//! Each tool family (word processing, spreadsheets, PDF, ...) exposes its
//! operations through a [`HandlerRegistry`] over its own document type.
//! A tool call names an operation; the registry finds its
//! [`OperationHandler`], which reads typed values from
//! [`OperationParameters`] and works on the document held in an
//! [`OperationContext`].

pub mod context;
pub mod parameters;
pub mod registry;

pub use context::OperationContext;
pub use parameters::{FromParameter, Native, OperationParameters, RawParameter, Structured};
pub use registry::{HandlerDescriptor, HandlerFactory, HandlerRegistry, OperationHandler};
