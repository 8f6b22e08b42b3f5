//! Roster domain model.
//!
//! # Responsibility
//! - Define the canonical patient/task records shared by parser, rules,
//!   merger, formatters and persistence.
//! - Keep the serialized field names stable for snapshot round-trips.
//!
//! # Invariants
//! - Every patient and task is identified by a UUID that is never reused.
//! - A task's `done_time` is set if and only if `done` is true.

pub mod patient;
pub mod section;
pub mod task;
