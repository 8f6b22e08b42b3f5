//! Keyword classifiers for line segments.
//!
//! # Responsibility
//! - Pull clinical flag codes out of free text.
//! - Decide whether a `|` segment is an actionable task or a status note.
//! - Infer urgency, category and time of day for extracted tasks.
//!
//! # Invariants
//! - Every classifier is total: unmatched input yields a default, never an
//!   error.

use crate::model::task::{TaskCategory, Urgency};
use once_cell::sync::Lazy;
use regex::Regex;

static FLAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:DNR|DNI|NPO|FALL|ISO|MRSA|VRE|ESBL|C\.?\s?DIFF)\b")
        .expect("valid flag regex")
});
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}:\d{2})\b").expect("valid time regex"));
static TASK_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)בדיק|תור |לתת |להזמין|לבצע|למדוד|לשלוח|טיפול|ניקוז|עירוי|צילום|ייעוץ|תרבית",
        r"|א\.?ק\.?ג|אולטרסאונד|\bBS\b|bladder\s*scan",
        r"|\b(?:CT|MRI|US|ECG|EKG|CBC|CRP|INR)\b",
    ))
    .expect("valid task marker regex")
});

/// Urgency markers, first match wins.
static URGENCY_MARKERS: Lazy<Vec<(Regex, Urgency)>> = Lazy::new(|| {
    [
        (r"(?i)דחוף|סטט|\bSTAT\b", Urgency::Stat),
        (r"(?i)אורגנטי|\burgent\b", Urgency::Urgent),
        (r"בוקר", Urgency::Morning),
        (r"שגרה", Urgency::Routine),
    ]
    .into_iter()
    .map(|(pattern, urgency)| {
        (
            Regex::new(pattern).expect("valid urgency marker regex"),
            urgency,
        )
    })
    .collect()
});

/// Category markers, first match wins.
static CATEGORY_MARKERS: Lazy<Vec<(Regex, TaskCategory)>> = Lazy::new(|| {
    [
        (r"שחרור|משתחרר|לשחרר|מכתב", TaskCategory::Discharge),
        (r"(?i)ייעוץ|התייעצות|\bconsult", TaskCategory::Consult),
        (
            r"(?i)צילום|אולטרסאונד|אקו|\b(?:CT|MRI|US|X-?ray)\b",
            TaskCategory::Imaging,
        ),
        (
            r"(?i)בדיקת דם|ספירה|כימיה|תרבית|אשלגן|נתרן|קריאטינין|\b(?:CBC|CRP|INR|labs?)\b",
            TaskCategory::Labs,
        ),
        (
            r"(?i)\bBS\b|bladder\s*scan|ניקוז|קטטר|א\.?ק\.?ג|\b(?:ECG|EKG)\b",
            TaskCategory::Procedure,
        ),
        (
            r"(?i)לתת|עירוי|תרופ|אנטיביוטיקה|מינון|\b(?:IV|PO)\b",
            TaskCategory::Meds,
        ),
    ]
    .into_iter()
    .map(|(pattern, category)| {
        (
            Regex::new(pattern).expect("valid category marker regex"),
            category,
        )
    })
    .collect()
});

/// Flags found in a segment plus the text with those flags removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagScan {
    pub flags: Vec<String>,
    pub cleaned: String,
}

/// Extracts flag codes case-insensitively.
///
/// Codes are uppercased with whitespace removed; every C.DIFF spelling
/// (`cdiff`, `C. diff`, `C.DIFF`) collapses to `C.DIFF`.
pub fn extract_flags(text: &str) -> FlagScan {
    let flags = FLAG_RE
        .find_iter(text)
        .map(|found| canonical_flag(found.as_str()))
        .collect();
    let cleaned = FLAG_RE.replace_all(text, " ").trim().to_string();
    FlagScan { flags, cleaned }
}

fn canonical_flag(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    if compact.ends_with("DIFF") {
        "C.DIFF".to_string()
    } else {
        compact
    }
}

/// Whether a segment reads as an action rather than an observation.
pub fn is_task_segment(text: &str) -> bool {
    TASK_MARKER_RE.is_match(text)
}

/// Urgency by marker lookup, `Routine` when nothing matches.
pub fn detect_urgency(text: &str) -> Urgency {
    URGENCY_MARKERS
        .iter()
        .find(|(marker, _)| marker.is_match(text))
        .map_or(Urgency::Routine, |(_, urgency)| *urgency)
}

/// Category by marker lookup.
pub fn detect_category(text: &str) -> Option<TaskCategory> {
    CATEGORY_MARKERS
        .iter()
        .find(|(marker, _)| marker.is_match(text))
        .map(|(_, category)| *category)
}

/// First `H:MM`/`HH:MM` time of day in the text.
pub fn extract_time(text: &str) -> Option<String> {
    TIME_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        detect_category, detect_urgency, extract_flags, extract_time, is_task_segment,
    };
    use crate::model::task::{TaskCategory, Urgency};

    #[test]
    fn extract_flags_removes_codes_and_canonicalizes() {
        let scan = extract_flags("דלקת ריאות dnr NPO c. diff");
        assert_eq!(scan.flags, vec!["DNR", "NPO", "C.DIFF"]);
        assert_eq!(scan.cleaned, "דלקת ריאות");
    }

    #[test]
    fn extract_flags_ignores_embedded_letters() {
        let scan = extract_flags("ISOSORBIDE fallback");
        assert!(scan.flags.is_empty());
        assert_eq!(scan.cleaned, "ISOSORBIDE fallback");
    }

    #[test]
    fn task_markers_cover_verbs_and_abbreviations() {
        assert!(is_task_segment("בדיקת דם בבוקר"));
        assert!(is_task_segment("BS בערב"));
        assert!(is_task_segment("א.ק.ג"));
        assert!(is_task_segment("CT ראש"));
        assert!(!is_task_segment("משתחרר היום"));
        assert!(!is_task_segment("מוניטור רציף"));
    }

    #[test]
    fn urgency_defaults_to_routine() {
        assert_eq!(detect_urgency("א.ק.ג דחוף"), Urgency::Stat);
        assert_eq!(detect_urgency("CT urgent"), Urgency::Urgent);
        assert_eq!(detect_urgency("בדיקת דם בבוקר"), Urgency::Morning);
        assert_eq!(detect_urgency("צילום חזה"), Urgency::Routine);
        assert_eq!(detect_urgency("status post"), Urgency::Routine);
    }

    #[test]
    fn category_lookup_is_ordered() {
        assert_eq!(detect_category("BS בערב"), Some(TaskCategory::Procedure));
        assert_eq!(detect_category("בדיקת דם בבוקר"), Some(TaskCategory::Labs));
        assert_eq!(detect_category("צילום חזה"), Some(TaskCategory::Imaging));
        assert_eq!(detect_category("לתת אנטיביוטיקה"), Some(TaskCategory::Meds));
        assert_eq!(detect_category("ייעוץ קרדיולוגי"), Some(TaskCategory::Consult));
        assert_eq!(detect_category("לשלוח פקס"), None);
    }

    #[test]
    fn extract_time_finds_first_clock_value() {
        assert_eq!(extract_time("עירוי ב-16:30 ואז 20:00"), Some("16:30".to_string()));
        assert_eq!(extract_time("בדיקת דם"), None);
    }
}
