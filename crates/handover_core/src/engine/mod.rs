//! Roster computation engines.
//!
//! # Responsibility
//! - `rules`: keyword trigger table producing generated tasks.
//! - `merge`: reconciliation of a new scan against the current roster.
//!
//! # Invariants
//! - Both engines are pure functions of their inputs apart from fresh ids
//!   and the merge clock.

pub mod merge;
pub mod rules;
