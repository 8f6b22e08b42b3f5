//! Free-text ward list parser.
//!
//! # Responsibility
//! - Turn pasted or OCR'd handover text into ordered patient rows.
//! - Track the current ward section across header lines.
//!
//! # Invariants
//! - Parsing never fails; unusable lines are skipped silently.
//! - Output order equals line order.
//! - Every emitted row already carries rule-engine tasks.

pub mod line;
pub mod segment;

use crate::model::patient::PatientEntry;
use crate::model::section::Section;
use chrono::{DateTime, Utc};
use log::info;
use std::time::Instant;

pub use line::parse_patient_line;

/// Date format written on ward sheets.
pub const SHEET_DATE_FORMAT: &str = "%d/%m/%Y";

/// Caller-controlled parse context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Timestamp stamped into `scanned_at`/`created_at`/`updated_at`.
    pub scanned_at: DateTime<Utc>,
    /// As-written sheet date, `DD/MM/YYYY`.
    pub date: String,
    /// Section assumed until the first header line.
    pub initial_section: Section,
}

impl ParseOptions {
    /// Options pinned to `scanned_at`, dated the same (UTC) day.
    pub fn at(scanned_at: DateTime<Utc>) -> Self {
        Self {
            scanned_at,
            date: scanned_at.format(SHEET_DATE_FORMAT).to_string(),
            initial_section: Section::default(),
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            scanned_at: now,
            date: chrono::Local::now().format(SHEET_DATE_FORMAT).to_string(),
            initial_section: Section::default(),
        }
    }
}

/// Parses a ward list using the current clock.
pub fn parse_patient_list(text: &str) -> Vec<PatientEntry> {
    parse_patient_list_with(text, &ParseOptions::default())
}

/// Parses a ward list with explicit options.
///
/// Header lines (`צד א`, `צד ב`, `צד ג`, `שיקום`, any spacing) switch the
/// section for following lines and are never patient rows themselves.
pub fn parse_patient_list_with(text: &str, options: &ParseOptions) -> Vec<PatientEntry> {
    let started_at = Instant::now();
    let mut section = options.initial_section;
    let mut patients = Vec::new();
    let mut lines = 0_usize;
    let mut headers = 0_usize;

    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        lines += 1;

        if let Some(header) = Section::detect_header(trimmed) {
            section = header;
            headers += 1;
            continue;
        }

        if let Some(entry) =
            parse_patient_line(trimmed, section, &options.date, options.scanned_at)
        {
            patients.push(entry);
        }
    }

    info!(
        "event=scan_parse module=parser status=ok lines={} headers={} patients={} skipped={} duration_ms={}",
        lines,
        headers,
        patients.len(),
        lines - headers - patients.len(),
        started_at.elapsed().as_millis()
    );
    patients
}
