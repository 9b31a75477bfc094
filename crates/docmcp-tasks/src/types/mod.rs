//! Task status and the payload returned to polling clients.
//!
//! Internal storage concerns (owner, arguments, cancellation handle) live on
//! [`TaskRecord`](crate::domain::TaskRecord); only what a client may see is
//! serialized from here.

pub mod task;

pub use task::*;
