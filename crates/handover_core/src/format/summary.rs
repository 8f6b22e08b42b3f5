//! End-of-shift handover summary.

use super::{name_or_unknown, room_or_unknown, STAMP_FORMAT};
use crate::model::patient::PatientEntry;
use crate::model::task::{Task, TaskSource};
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static CONSULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ייעוץ|שיחה|consult").expect("valid consult regex"));

const NONE_LINE: &str = "- אין";

/// `room name (age)` with placeholders for missing fields.
pub fn patient_line(patient: &PatientEntry) -> String {
    let age = patient
        .age
        .map(|age| format!(" ({age})"))
        .unwrap_or_default();
    format!(
        "{} {}{}",
        room_or_unknown(patient),
        name_or_unknown(patient),
        age
    )
}

fn push_patient_list<'a>(
    lines: &mut Vec<String>,
    title: &str,
    patients: impl Iterator<Item = &'a PatientEntry>,
    render: impl Fn(&PatientEntry) -> String,
) {
    lines.push(String::new());
    lines.push(title.to_string());
    let before = lines.len();
    lines.extend(patients.map(|patient| format!("- {}", render(patient))));
    if lines.len() == before {
        lines.push(NONE_LINE.to_string());
    }
}

/// Renders the shift-end summary.
///
/// Sections: patients with open tasks (every open task tagged by urgency),
/// admissions created at or after `session_start`, patients with an open
/// `stat` task, and patients with an open consult/family-talk task.
pub fn handover_summary(
    patients: &[PatientEntry],
    session_start: DateTime<Utc>,
    generated_at: NaiveDateTime,
) -> String {
    let with_open: Vec<(&PatientEntry, Vec<&Task>)> = patients
        .iter()
        .map(|patient| (patient, patient.open_tasks().collect::<Vec<_>>()))
        .filter(|(_, tasks)| !tasks.is_empty())
        .collect();

    let mut lines = vec![
        "סיכום העברה (Handover)".to_string(),
        format!("נוצר: {}", generated_at.format(STAMP_FORMAT)),
        String::new(),
    ];

    if with_open.is_empty() {
        lines.push("אין משימות פתוחות.".to_string());
    } else {
        lines.push("מטופלים עם משימות פתוחות:".to_string());
        for (patient, tasks) in &with_open {
            lines.push(format!("- {}", patient_line(patient)));
            for task in tasks {
                let manual = if task.source == TaskSource::Manual {
                    " (manual)"
                } else {
                    ""
                };
                lines.push(format!(
                    "  • [{}] {}{}",
                    task.urgency.as_str().to_uppercase(),
                    task.text,
                    manual
                ));
            }
        }
    }

    push_patient_list(
        &mut lines,
        "חדשים במשמרת:",
        patients
            .iter()
            .filter(|patient| patient.created_at >= session_start),
        |patient| match patient.diagnosis.as_deref() {
            Some(diagnosis) => format!("{} | {}", patient_line(patient), diagnosis),
            None => patient_line(patient),
        },
    );
    push_patient_list(
        &mut lines,
        "דחופים (STAT פתוח):",
        with_open
            .iter()
            .filter(|(patient, _)| patient.has_open_stat())
            .map(|(patient, _)| *patient),
        patient_line,
    );
    push_patient_list(
        &mut lines,
        "ייעוצים/שיחות פתוחים:",
        with_open
            .iter()
            .filter(|(_, tasks)| tasks.iter().any(|task| CONSULT_RE.is_match(&task.text)))
            .map(|(patient, _)| *patient),
        patient_line,
    );

    lines.join("\n")
}
