//! Domain types for internal task representation.
//!
//! [`TaskRecord`] is the store's internal representation, holding the owner,
//! the copied arguments and the cancellation handle next to the fields that
//! are reported to clients through
//! [`TaskStatusPayload`](crate::types::TaskStatusPayload).

pub mod record;

pub use record::*;
