//! Use-case services over the roster.
//!
//! # Responsibility
//! - Apply user and scan actions to the roster in one place.
//! - Persist through a [`crate::repo::roster_repo::RosterStore`] after every
//!   successful mutation.

pub mod roster_service;
