//! Roster use-case service.
//!
//! # Responsibility
//! - Import scans (parse + merge) and apply the edit actions a ward UI
//!   offers: task toggling, manual tasks, notes, patient edits, deletion.
//! - Write the roster back to the store after each mutation.
//!
//! # Invariants
//! - A failed action leaves the roster unchanged: edits are applied to a
//!   copy that replaces the roster only after the store accepts it.
//! - Blank task or note text is rejected, never stored.
//! - Patient ids are never reassigned by an edit.

use crate::engine::merge::{merge_scan_at, MergeStats};
use crate::model::patient::{PatientEntry, PatientId};
use crate::model::section::Section;
use crate::model::task::{Task, TaskId, Urgency};
use crate::parser::{parse_patient_list_with, ParseOptions};
use crate::repo::roster_repo::{RosterStore, ScanRecord, StoreError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RosterResult<T> = Result<T, RosterError>;

#[derive(Debug)]
pub enum RosterError {
    PatientNotFound(PatientId),
    TaskNotFound {
        patient_id: PatientId,
        task_id: TaskId,
    },
    NoteNotFound {
        patient_id: PatientId,
        index: usize,
    },
    EmptyText,
    Store(StoreError),
}

impl Display for RosterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PatientNotFound(id) => write!(f, "patient not found: {id}"),
            Self::TaskNotFound {
                patient_id,
                task_id,
            } => write!(f, "task {task_id} not found on patient {patient_id}"),
            Self::NoteNotFound { patient_id, index } => {
                write!(f, "note #{index} not found on patient {patient_id}")
            }
            Self::EmptyText => write!(f, "text must not be blank"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RosterError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Outcome of [`RosterService::import_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows the parser produced from the text.
    pub parsed: usize,
    pub stats: MergeStats,
}

/// Field edits for one patient. `None` leaves a field untouched; for the
/// optional fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientPatch {
    pub section: Option<Section>,
    pub room: Option<Option<String>>,
    pub name: Option<Option<String>>,
    pub age: Option<Option<u32>>,
    pub diagnosis: Option<Option<String>>,
    pub flags: Option<Vec<String>>,
    pub status: Option<Vec<String>>,
}

impl PatientPatch {
    fn apply(self, patient: &mut PatientEntry) {
        if let Some(section) = self.section {
            patient.section = section;
        }
        if let Some(room) = self.room {
            patient.room = non_blank(room);
        }
        if let Some(name) = self.name {
            patient.name = non_blank(name);
        }
        if let Some(age) = self.age {
            patient.age = age.filter(|age| *age > 0);
        }
        if let Some(diagnosis) = self.diagnosis {
            patient.diagnosis = non_blank(diagnosis);
        }
        if let Some(flags) = self.flags {
            patient.flags.clear();
            for flag in flags {
                if let Some(flag) = non_blank(Some(flag)) {
                    patient.add_flag(flag);
                }
            }
        }
        if let Some(status) = self.status {
            patient.status = status
                .into_iter()
                .filter_map(|note| non_blank(Some(note)))
                .collect();
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn required_text(text: &str) -> RosterResult<String> {
    non_blank(Some(text.to_string())).ok_or(RosterError::EmptyText)
}

/// Roster state plus the store it is written to.
pub struct RosterService<S: RosterStore> {
    store: S,
    roster: Vec<PatientEntry>,
}

impl<S: RosterStore> RosterService<S> {
    /// Loads the saved roster from `store`.
    pub fn open(store: S) -> RosterResult<Self> {
        let roster = store.load()?;
        info!(
            "event=roster_open module=service status=ok patients={}",
            roster.len()
        );
        Ok(Self { store, roster })
    }

    pub fn roster(&self) -> &[PatientEntry] {
        &self.roster
    }

    pub fn patient(&self, patient_id: PatientId) -> Option<&PatientEntry> {
        self.roster.iter().find(|patient| patient.id == patient_id)
    }

    /// Patients of one section in roster order.
    pub fn patients_in_section(&self, section: Section) -> impl Iterator<Item = &PatientEntry> {
        self.roster
            .iter()
            .filter(move |patient| patient.section == section)
    }

    /// Parses `text` and merges the result into the roster.
    ///
    /// The merge clock is `options.scanned_at`, so an import is reproducible
    /// for a fixed set of options. The import log entry is written after the
    /// roster is saved; failing to write it is logged and does not fail the
    /// import.
    pub fn import_text(&mut self, text: &str, options: &ParseOptions) -> RosterResult<ImportReport> {
        let parsed = parse_patient_list_with(text, options);
        let (merged, stats) = merge_scan_at(&self.roster, &parsed, options.scanned_at);
        self.commit(merged)?;

        let record = ScanRecord {
            scanned_at: options.scanned_at,
            parsed: parsed.len(),
            matched: stats.matched_strict + stats.matched_loose,
            added: stats.added,
            retained: stats.retained,
        };
        if let Err(err) = self.store.record_scan(&record) {
            warn!("event=scan_record module=service status=error error={err}");
        }

        info!(
            "event=roster_import module=service status=ok parsed={} patients={}",
            parsed.len(),
            self.roster.len()
        );
        Ok(ImportReport {
            parsed: parsed.len(),
            stats,
        })
    }

    /// Flips a task's completion. Returns the new `done` value.
    pub fn toggle_task(
        &mut self,
        patient_id: PatientId,
        task_id: TaskId,
        at: DateTime<Utc>,
    ) -> RosterResult<bool> {
        let done = self.edit(|roster| {
            let patient = find_patient(roster, patient_id)?;
            let task = patient.task_mut(task_id).ok_or(RosterError::TaskNotFound {
                patient_id,
                task_id,
            })?;
            task.toggle(at);
            Ok(task.done)
        })?;
        debug!("event=task_toggle module=service status=ok done={done}");
        Ok(done)
    }

    /// Appends a manual task. Returns its id.
    pub fn add_task(
        &mut self,
        patient_id: PatientId,
        text: &str,
        urgency: Urgency,
    ) -> RosterResult<TaskId> {
        let text = required_text(text)?;
        let task_id = self.edit(|roster| {
            let task = Task::manual(text, urgency);
            let task_id = task.id;
            find_patient(roster, patient_id)?.tasks.push(task);
            Ok(task_id)
        })?;
        debug!(
            "event=task_add module=service status=ok urgency={}",
            urgency.as_str()
        );
        Ok(task_id)
    }

    /// Removes a task from either task list.
    pub fn delete_task(&mut self, patient_id: PatientId, task_id: TaskId) -> RosterResult<()> {
        self.edit(|roster| {
            if find_patient(roster, patient_id)?.remove_task(task_id) {
                Ok(())
            } else {
                Err(RosterError::TaskNotFound {
                    patient_id,
                    task_id,
                })
            }
        })
    }

    /// Appends a status note.
    pub fn add_note(&mut self, patient_id: PatientId, note: &str) -> RosterResult<()> {
        let note = required_text(note)?;
        self.edit(|roster| {
            find_patient(roster, patient_id)?.status.push(note);
            Ok(())
        })
    }

    /// Removes the status note at `index`.
    pub fn remove_note(&mut self, patient_id: PatientId, index: usize) -> RosterResult<()> {
        self.edit(|roster| {
            let patient = find_patient(roster, patient_id)?;
            if index >= patient.status.len() {
                return Err(RosterError::NoteNotFound { patient_id, index });
            }
            patient.status.remove(index);
            Ok(())
        })
    }

    pub fn edit_patient(
        &mut self,
        patient_id: PatientId,
        patch: PatientPatch,
        at: DateTime<Utc>,
    ) -> RosterResult<()> {
        self.edit(|roster| {
            let patient = find_patient(roster, patient_id)?;
            patch.apply(patient);
            patient.updated_at = at;
            Ok(())
        })
    }

    pub fn delete_patient(&mut self, patient_id: PatientId) -> RosterResult<()> {
        self.edit(|roster| {
            let before = roster.len();
            roster.retain(|patient| patient.id != patient_id);
            if roster.len() == before {
                return Err(RosterError::PatientNotFound(patient_id));
            }
            Ok(())
        })
    }

    /// Empties the roster and the saved snapshot.
    pub fn clear_all(&mut self) -> RosterResult<()> {
        self.store.clear()?;
        let removed = self.roster.len();
        self.roster.clear();
        info!("event=roster_clear module=service status=ok removed={removed}");
        Ok(())
    }

    /// Most recent imports first.
    pub fn scan_history(&self, limit: u32) -> RosterResult<Vec<ScanRecord>> {
        Ok(self.store.scan_history(limit)?)
    }

    /// Runs `change` on a copy of the roster and keeps the copy only once it
    /// has been saved.
    fn edit<T>(
        &mut self,
        change: impl FnOnce(&mut Vec<PatientEntry>) -> RosterResult<T>,
    ) -> RosterResult<T> {
        let mut draft = self.roster.clone();
        let value = change(&mut draft)?;
        self.commit(draft)?;
        Ok(value)
    }

    fn commit(&mut self, next: Vec<PatientEntry>) -> RosterResult<()> {
        self.store.save(&next)?;
        self.roster = next;
        Ok(())
    }
}

fn find_patient(
    roster: &mut [PatientEntry],
    patient_id: PatientId,
) -> RosterResult<&mut PatientEntry> {
    roster
        .iter_mut()
        .find(|patient| patient.id == patient_id)
        .ok_or(RosterError::PatientNotFound(patient_id))
}

#[cfg(test)]
mod tests {
    use super::{PatientPatch, RosterError, RosterService};
    use crate::db::open_db_in_memory;
    use crate::model::section::Section;
    use crate::model::task::{TaskSource, Urgency};
    use crate::parser::ParseOptions;
    use crate::repo::roster_repo::SqliteRosterStore;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn options() -> ParseOptions {
        ParseOptions::at(Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap())
    }

    #[test]
    fn blank_task_text_is_rejected() {
        let conn = open_db_in_memory().expect("open db");
        let mut service = RosterService::open(SqliteRosterStore::new(&conn)).expect("open");
        service
            .import_text("101 כהן יוסף 72 דלקת ריאות", &options())
            .expect("import");
        let patient_id = service.roster()[0].id;

        let err = service
            .add_task(patient_id, "   ", Urgency::Routine)
            .expect_err("blank text must fail");
        assert!(matches!(err, RosterError::EmptyText));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let conn = open_db_in_memory().expect("open db");
        let mut service = RosterService::open(SqliteRosterStore::new(&conn)).expect("open");
        let missing = Uuid::new_v4();
        assert!(matches!(
            service.delete_patient(missing),
            Err(RosterError::PatientNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn patch_trims_and_clears_fields() {
        let conn = open_db_in_memory().expect("open db");
        let mut service = RosterService::open(SqliteRosterStore::new(&conn)).expect("open");
        service
            .import_text("101 כהן יוסף 72 דלקת ריאות", &options())
            .expect("import");
        let patient_id = service.roster()[0].id;
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        let patch = PatientPatch {
            section: Some(Section::Rehab),
            name: Some(Some("  לוי שרה ".to_string())),
            diagnosis: Some(None),
            age: Some(Some(0)),
            flags: Some(vec!["DNR".to_string(), " ".to_string(), "DNR".to_string()]),
            ..PatientPatch::default()
        };
        service.edit_patient(patient_id, patch, at).expect("edit");

        let patient = service.patient(patient_id).expect("patient kept");
        assert_eq!(patient.section, Section::Rehab);
        assert_eq!(patient.name.as_deref(), Some("לוי שרה"));
        assert_eq!(patient.diagnosis, None);
        assert_eq!(patient.age, None);
        assert_eq!(patient.flags, vec!["DNR".to_string()]);
        assert_eq!(patient.updated_at, at);
    }

    #[test]
    fn manual_task_is_added_with_manual_source() {
        let conn = open_db_in_memory().expect("open db");
        let mut service = RosterService::open(SqliteRosterStore::new(&conn)).expect("open");
        service
            .import_text("101 כהן יוסף 72", &options())
            .expect("import");
        let patient_id = service.roster()[0].id;

        let task_id = service
            .add_task(patient_id, " לתאם ייעוץ ", Urgency::Urgent)
            .expect("add task");
        let task = service.roster()[0]
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .expect("task stored");
        assert_eq!(task.text, "לתאם ייעוץ");
        assert_eq!(task.source, TaskSource::Manual);
        assert_eq!(task.urgency, Urgency::Urgent);
    }
}
