//! Patient roster row.
//!
//! # Responsibility
//! - Define the record produced by the list parser and reconciled by the
//!   scan merger.
//! - Keep extracted/manual tasks separate from rule-engine tasks so the
//!   latter can be fully replaced on rescan.
//!
//! # Invariants
//! - `id` is assigned once and never changes, even when section, room or
//!   name are edited or merged.
//! - `flags` holds no duplicates.
//! - `confidence` is within `[0, 1]`.

use crate::key::{build_key, build_loose_key};
use crate::model::section::Section;
use crate::model::task::{Task, TaskId, Urgency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a patient row; the join key across rescans.
pub type PatientId = Uuid;

/// A roster: ordered patient rows in scan arrival order.
pub type Roster = Vec<PatientEntry>;

/// One roster row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientEntry {
    pub id: PatientId,
    pub section: Section,
    /// Sheet date as written, `DD/MM/YYYY`.
    pub date: String,
    pub room: Option<String>,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub diagnosis: Option<String>,
    /// Short clinical codes such as `DNR`, `NPO`, `MRSA`.
    pub flags: Vec<String>,
    /// Informational notes, not actionable.
    pub status: Vec<String>,
    /// Extracted and manual tasks.
    pub tasks: Vec<Task>,
    /// Rule-engine tasks.
    pub generated_tasks: Vec<Task>,
    pub scanned_at: DateTime<Utc>,
    /// Share of structural fields the parser recognized.
    pub confidence: f64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_scan_count")]
    pub scan_count: u32,
}

fn default_scan_count() -> u32 {
    1
}

impl PatientEntry {
    /// Creates an empty row with a fresh identifier.
    pub fn new(section: Section, date: impl Into<String>, scanned_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            section,
            date: date.into(),
            room: None,
            name: None,
            age: None,
            diagnosis: None,
            flags: Vec::new(),
            status: Vec::new(),
            tasks: Vec::new(),
            generated_tasks: Vec::new(),
            scanned_at,
            confidence: 0.0,
            created_at: scanned_at,
            updated_at: scanned_at,
            scan_count: default_scan_count(),
        }
    }

    /// Strict identity: section + room + name.
    pub fn strict_key(&self) -> String {
        build_key(
            self.section.code(),
            self.room.as_deref(),
            self.name.as_deref(),
        )
    }

    /// Loose identity: room + name, used to detect section transfers.
    pub fn loose_key(&self) -> String {
        build_loose_key(self.room.as_deref(), self.name.as_deref())
    }

    /// Explicit tasks followed by generated tasks.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().chain(self.generated_tasks.iter())
    }

    /// Tasks not yet completed, explicit before generated.
    pub fn open_tasks(&self) -> impl Iterator<Item = &Task> {
        self.all_tasks().filter(|task| task.is_open())
    }

    /// Whether any open task is `stat`.
    pub fn has_open_stat(&self) -> bool {
        self.open_tasks().any(|task| task.urgency == Urgency::Stat)
    }

    /// Finds a task in either list by id.
    pub fn task_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks
            .iter_mut()
            .chain(self.generated_tasks.iter_mut())
            .find(|task| task.id == task_id)
    }

    /// Removes a task from either list. Returns whether anything was removed.
    pub fn remove_task(&mut self, task_id: TaskId) -> bool {
        let before = self.tasks.len() + self.generated_tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        self.generated_tasks.retain(|task| task.id != task_id);
        before != self.tasks.len() + self.generated_tasks.len()
    }

    /// Adds a flag unless already present.
    pub fn add_flag(&mut self, flag: impl Into<String>) {
        let flag = flag.into();
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PatientEntry;
    use crate::model::section::Section;
    use crate::model::task::{Task, Urgency};
    use chrono::{TimeZone, Utc};

    fn entry() -> PatientEntry {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
        let mut entry = PatientEntry::new(Section::SideB, "01/03/2024", at);
        entry.room = Some("49-3".to_string());
        entry.name = Some("כהן יוסף".to_string());
        entry
    }

    #[test]
    fn keys_ignore_room_punctuation() {
        let entry = entry();
        assert_eq!(entry.strict_key(), "sideb|493|כהןיוסף");
        assert_eq!(entry.loose_key(), "493|כהןיוסף");
    }

    #[test]
    fn add_flag_deduplicates() {
        let mut entry = entry();
        entry.add_flag("DNR");
        entry.add_flag("DNR");
        entry.add_flag("NPO");
        assert_eq!(entry.flags, vec!["DNR", "NPO"]);
    }

    #[test]
    fn remove_task_searches_both_lists() {
        let mut entry = entry();
        let generated = Task::generated("מעקה מיטה מורם", Urgency::Stat, "סיכון נפילה");
        let generated_id = generated.id;
        entry.generated_tasks.push(generated);

        assert!(entry.has_open_stat());
        assert!(entry.remove_task(generated_id));
        assert!(!entry.remove_task(generated_id));
        assert!(!entry.has_open_stat());
    }
}
