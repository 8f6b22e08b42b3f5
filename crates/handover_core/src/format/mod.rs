//! Plain-text renderings of a roster.
//!
//! # Responsibility
//! - `summary`: end-of-shift handover summary.
//! - `export`: shareable per-section handover message.
//!
//! # Invariants
//! - Renderers are pure: the same roster and timestamps give the same text.

pub mod export;
pub mod summary;

use crate::model::patient::PatientEntry;

/// Display format for generated-at stamps.
pub const STAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

const UNKNOWN_ROOM: &str = "?";
const UNKNOWN_NAME: &str = "לא ידוע";

fn room_or_unknown(patient: &PatientEntry) -> &str {
    patient.room.as_deref().unwrap_or(UNKNOWN_ROOM)
}

fn name_or_unknown(patient: &PatientEntry) -> &str {
    patient.name.as_deref().unwrap_or(UNKNOWN_NAME)
}
