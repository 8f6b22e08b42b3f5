//! Persistence contracts for the roster.
//!
//! # Responsibility
//! - Define the snapshot store the service layer writes through.
//! - Keep SQL and JSON encoding out of the service and engines.
//!
//! # Invariants
//! - A loaded roster has passed task validation; corrupt rows surface as
//!   errors instead of being silently repaired.

pub mod roster_repo;
