//! Core logic for ward handover rosters.
//! Parsing, task rules, scan merging and handover rendering live here; the
//! CLI and any UI only orchestrate these calls.

pub mod db;
pub mod engine;
pub mod format;
pub mod key;
pub mod logging;
pub mod model;
pub mod parser;
pub mod repo;
pub mod service;

pub use engine::merge::{merge_patient, merge_scan, merge_scan_at, MergeStats};
pub use engine::rules::{apply_rules, matching_rules};
pub use format::export::{export_text, ExportMode, ExportOptions};
pub use format::summary::handover_summary;
pub use key::{build_key, build_loose_key};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::patient::{PatientEntry, PatientId, Roster};
pub use model::section::Section;
pub use model::task::{Task, TaskCategory, TaskId, TaskSource, TaskValidationError, Urgency};
pub use parser::{parse_patient_list, parse_patient_list_with, ParseOptions};
pub use repo::roster_repo::{
    RosterStore, ScanRecord, SqliteRosterStore, StoreError, StoreResult,
};
pub use service::roster_service::{
    ImportReport, PatientPatch, RosterError, RosterResult, RosterService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
