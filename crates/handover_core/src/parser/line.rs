//! Single patient line tokenizer.
//!
//! A line reads `room name age diagnosis [flags] | segment | segment ...`.
//! Fields are consumed strictly in order (room, name, age, diagnosis) by a
//! cursor that never backtracks; a field that does not match is left `None`
//! and the cursor stays put for the next field.

use crate::engine::rules::apply_rules;
use crate::model::patient::PatientEntry;
use crate::model::section::Section;
use crate::model::task::Task;
use crate::parser::segment::{
    detect_category, detect_urgency, extract_flags, extract_time, is_task_segment,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines shorter than this (in chars, after trimming) are skipped.
pub const MIN_LINE_CHARS: usize = 3;

const SEGMENT_DELIMITER: char = '|';
const MIN_AGE: u32 = 1;
const MAX_AGE: u32 = 149;

const ROOM_WEIGHT: f64 = 0.25;
const NAME_WEIGHT: f64 = 0.35;
const AGE_WEIGHT: f64 = 0.10;
const DIAGNOSIS_WEIGHT: f64 = 0.20;
const BASE_CONFIDENCE: f64 = 0.10;

/// Words that name a room when followed by a separate number (`ניטור 1`).
const ROOM_WORDS: &[&str] = &["ניטור", "חדר", "מסדרון", "בידוד"];

static ROOM_SIMPLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}[א-ת]?$").expect("valid room regex"));
static ROOM_COMPOUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}[-/]\d{1,4}$").expect("valid compound room regex"));
static ROOM_WORD_DASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[א-ת]+-\d{1,4}$").expect("valid hyphenated room regex"));
static ROOM_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}$").expect("valid room number regex"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[א-ת][א-ת'׳\-]*$").expect("valid name regex"));

/// Sequential reader over whitespace-separated tokens.
struct TokenCursor<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            tokens: text.split_whitespace().collect(),
            pos: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<&'a str> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn advance(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.tokens.len());
    }

    /// Consumes the next token when `accept` returns a value for it.
    fn take_map<T>(&mut self, accept: impl FnOnce(&'a str) -> Option<T>) -> Option<T> {
        let value = self.peek(0).and_then(accept)?;
        self.advance(1);
        Some(value)
    }

    fn rest(&self) -> &[&'a str] {
        &self.tokens[self.pos..]
    }
}

/// Room: compound and word formats first, then the simple numeric rule.
fn take_room(cursor: &mut TokenCursor<'_>) -> Option<String> {
    let first = cursor.peek(0)?;

    if ROOM_COMPOUND_RE.is_match(first) || ROOM_WORD_DASH_RE.is_match(first) {
        cursor.advance(1);
        return Some(first.to_string());
    }

    if ROOM_WORDS.contains(&first) {
        if let Some(number) = cursor.peek(1).filter(|next| ROOM_NUMBER_RE.is_match(next)) {
            cursor.advance(2);
            return Some(format!("{first} {number}"));
        }
    }

    cursor.take_map(|token| ROOM_SIMPLE_RE.is_match(token).then(|| token.to_string()))
}

fn take_name(cursor: &mut TokenCursor<'_>) -> Option<String> {
    let mut parts = Vec::new();
    while let Some(part) = cursor.take_map(|token| NAME_RE.is_match(token).then_some(token)) {
        parts.push(part);
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn take_age(cursor: &mut TokenCursor<'_>) -> Option<u32> {
    cursor.take_map(parse_age)
}

/// Integer in the plausible human range, otherwise `None`.
pub fn parse_age(token: &str) -> Option<u32> {
    token
        .parse::<u32>()
        .ok()
        .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
}

/// Weighted share of recognized fields, rounded to two decimals.
fn row_confidence(entry: &PatientEntry) -> f64 {
    let mut score = BASE_CONFIDENCE;
    if entry.room.is_some() {
        score += ROOM_WEIGHT;
    }
    if entry.name.is_some() {
        score += NAME_WEIGHT;
    }
    if entry.age.is_some() {
        score += AGE_WEIGHT;
    }
    if entry.diagnosis.is_some() {
        score += DIAGNOSIS_WEIGHT;
    }
    ((score * 100.0).round() / 100.0).min(1.0)
}

/// Parses one non-header line into a patient row.
///
/// Returns `None` for lines that are too short or carry no usable field
/// (no room, name, age, diagnosis or task).
pub fn parse_patient_line(
    line: &str,
    section: Section,
    date: &str,
    scanned_at: DateTime<Utc>,
) -> Option<PatientEntry> {
    let trimmed = line.trim();
    if trimmed.chars().count() < MIN_LINE_CHARS {
        return None;
    }

    let mut segments = trimmed.split(SEGMENT_DELIMITER).map(str::trim);
    let main = segments.next().unwrap_or_default();
    let extras: Vec<&str> = segments.filter(|segment| !segment.is_empty()).collect();

    let mut entry = PatientEntry::new(section, date, scanned_at);

    let main_scan = extract_flags(main);
    for flag in main_scan.flags {
        entry.add_flag(flag);
    }

    let mut cursor = TokenCursor::new(&main_scan.cleaned);
    entry.room = take_room(&mut cursor);
    entry.name = take_name(&mut cursor);
    entry.age = take_age(&mut cursor);
    let diagnosis = cursor.rest().join(" ");
    entry.diagnosis = (!diagnosis.is_empty()).then_some(diagnosis);

    for segment in &extras {
        if is_task_segment(segment) {
            entry.tasks.push(Task::extracted(
                *segment,
                detect_urgency(segment),
                detect_category(segment),
                extract_time(segment),
            ));
        } else {
            entry.status.push(segment.to_string());
        }
    }
    for segment in &extras {
        for flag in extract_flags(segment).flags {
            entry.add_flag(flag);
        }
    }

    let has_content = entry.room.is_some()
        || entry.name.is_some()
        || entry.age.is_some()
        || entry.diagnosis.is_some()
        || !entry.tasks.is_empty();
    if !has_content {
        return None;
    }

    entry.confidence = row_confidence(&entry);
    entry.generated_tasks = apply_rules(&entry);
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::{parse_age, parse_patient_line, TokenCursor, take_name, take_room};
    use crate::model::section::Section;
    use chrono::Utc;

    fn room_of(text: &str) -> (Option<String>, usize) {
        let mut cursor = TokenCursor::new(text);
        let room = take_room(&mut cursor);
        (room, cursor.pos)
    }

    #[test]
    fn room_formats_are_recognized() {
        assert_eq!(room_of("101 כהן"), (Some("101".to_string()), 1));
        assert_eq!(room_of("12א כהן"), (Some("12א".to_string()), 1));
        assert_eq!(room_of("49-3 כהן"), (Some("49-3".to_string()), 1));
        assert_eq!(room_of("55/1 כהן"), (Some("55/1".to_string()), 1));
        assert_eq!(room_of("ניטור-1 כהן"), (Some("ניטור-1".to_string()), 1));
        assert_eq!(room_of("ניטור 1 כהן"), (Some("ניטור 1".to_string()), 2));
    }

    #[test]
    fn missing_room_does_not_advance() {
        assert_eq!(room_of("כהן יוסף 72"), (None, 0));
        assert_eq!(room_of("לוי 65"), (None, 0));
        assert_eq!(room_of("12345 כהן"), (None, 0));
    }

    #[test]
    fn name_stops_at_first_non_hebrew_token() {
        let mut cursor = TokenCursor::new("בן-דוד ג'ורג' 80 CHF");
        assert_eq!(take_name(&mut cursor).as_deref(), Some("בן-דוד ג'ורג'"));
        assert_eq!(cursor.rest(), &["80", "CHF"]);
    }

    #[test]
    fn parse_age_rejects_implausible_values() {
        assert_eq!(parse_age("72"), Some(72));
        assert_eq!(parse_age("0"), None);
        assert_eq!(parse_age("150"), None);
        assert_eq!(parse_age("7x"), None);
    }

    #[test]
    fn short_and_empty_lines_are_skipped() {
        let now = Utc::now();
        assert!(parse_patient_line("12", Section::SideA, "01/01/2024", now).is_none());
        assert!(parse_patient_line("DNR | משתחרר", Section::SideA, "01/01/2024", now).is_none());
    }

    #[test]
    fn confidence_is_weighted_and_capped() {
        let now = Utc::now();
        let full = parse_patient_line("101 כהן יוסף 72 דלקת ריאות", Section::SideA, "d", now)
            .expect("full line should parse");
        assert!((full.confidence - 1.0).abs() < f64::EPSILON);

        let partial = parse_patient_line("כהן יוסף", Section::SideA, "d", now)
            .expect("name-only line should parse");
        assert!((partial.confidence - 0.45).abs() < 1e-9);
    }
}
