//! Shareable per-section handover message (chat-friendly markup).

use super::{name_or_unknown, room_or_unknown, STAMP_FORMAT};
use crate::model::patient::PatientEntry;
use crate::model::section::Section;
use crate::model::task::Urgency;
use chrono::NaiveDateTime;

/// Which patients an export includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// Only patients with at least one open task.
    #[default]
    PendingOnly,
    /// Every patient in the selected sections.
    All,
}

/// Export selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Sections to include, rendered in [`Section::ALL`] order.
    pub sections: Vec<Section>,
    pub mode: ExportMode,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sections: Section::ALL.to_vec(),
            mode: ExportMode::default(),
        }
    }
}

fn urgency_marker(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Stat => "🔴",
        Urgency::Urgent => "🟠",
        Urgency::Morning => "🟡",
        Urgency::Routine => "⚪",
    }
}

fn patient_header(patient: &PatientEntry) -> String {
    let mut header = format!(
        "🔸 *{} {}*",
        room_or_unknown(patient),
        name_or_unknown(patient)
    );
    if let Some(age) = patient.age {
        header.push_str(&format!(" {age}ש"));
    }
    if !patient.flags.is_empty() {
        header.push_str(&format!(" [{}]", patient.flags.join(" ")));
    }
    header
}

/// Renders the export message.
///
/// Open `stat`/`urgent` tasks are listed before `morning`/`routine` ones;
/// completed tasks are only counted.
pub fn export_text(
    patients: &[PatientEntry],
    options: &ExportOptions,
    generated_at: NaiveDateTime,
) -> String {
    let included: Vec<&PatientEntry> = patients
        .iter()
        .filter(|patient| match options.mode {
            ExportMode::PendingOnly => patient.open_tasks().next().is_some(),
            ExportMode::All => true,
        })
        .collect();

    let mut lines = vec![
        format!("🏥 *מסירת משמרת - {}*", generated_at.format(STAMP_FORMAT)),
        String::new(),
    ];
    let mut rendered = 0_usize;
    let mut total_tasks = 0_usize;
    let mut done_tasks = 0_usize;

    for section in Section::ALL {
        if !options.sections.contains(&section) {
            continue;
        }
        let members: Vec<&PatientEntry> = included
            .iter()
            .copied()
            .filter(|patient| patient.section == section)
            .collect();
        if members.is_empty() {
            continue;
        }

        lines.push(format!(
            "*── {} ({} חולים) ──*",
            section.label(),
            members.len()
        ));

        for patient in members {
            rendered += 1;
            let done = patient.all_tasks().filter(|task| task.done).count();
            total_tasks += patient.all_tasks().count();
            done_tasks += done;

            lines.push(patient_header(patient));
            if let Some(diagnosis) = patient.diagnosis.as_deref() {
                lines.push(format!("   📋 {diagnosis}"));
            }
            if !patient.status.is_empty() {
                lines.push(format!("   💬 {}", patient.status.join(" | ")));
            }

            let (pressing, later): (Vec<_>, Vec<_>) = patient
                .open_tasks()
                .partition(|task| task.urgency >= Urgency::Urgent);
            for task in pressing.into_iter().chain(later) {
                lines.push(format!("   {} {}", urgency_marker(task.urgency), task.text));
            }

            if done > 0 {
                lines.push(format!("   ✅ {done} משימות הושלמו"));
            }
            lines.push(String::new());
        }
    }

    lines.push(format!(
        "*📊 סיכום: {rendered} חולים | {done_tasks}/{total_tasks} משימות הושלמו*"
    ));
    lines.join("\n")
}
