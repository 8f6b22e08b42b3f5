use chrono::{DateTime, TimeZone, Utc};
use handover_core::{
    merge_scan, merge_scan_at, parse_patient_list_with, ParseOptions, PatientEntry, Section,
    Task, Urgency,
};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap()
}

fn scan(text: &str, hour: u32) -> Vec<PatientEntry> {
    parse_patient_list_with(text, &ParseOptions::at(at(hour)))
}

const WARD: &str = "צד א\n101 כהן יוסף 72 דלקת ריאות | בדיקת דם בבוקר\n102 לוי שרה 65 CHF\nצד ב\n201 מזרחי דוד 80 סוכרת";

#[test]
fn identical_rescan_keeps_patient_count_and_ids() {
    let first = merge_scan(&[], &scan(WARD, 7));
    let (second, stats) = merge_scan_at(&first, &scan(WARD, 9), at(9));

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(stats.matched_strict, 3);
    assert_eq!(stats.added, 0);
    for (before, after) in first.iter().zip(&second) {
        assert_eq!(before.id, after.id);
        assert_eq!(after.scan_count, 2);
        assert_eq!(after.updated_at, at(9));
        assert_eq!(after.created_at, before.created_at);
    }
}

#[test]
fn loose_match_moves_patient_between_sections() {
    let roster = merge_scan(&[], &scan("צד א\n101 כהן יוסף 72", 7));
    let (merged, stats) = merge_scan_at(&roster, &scan("צד ב\n101 כהן יוסף 72", 9), at(9));

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, roster[0].id);
    assert_eq!(merged[0].section, Section::SideB);
    assert_eq!(stats.matched_loose, 1);
}

#[test]
fn key_normalization_ignores_room_punctuation() {
    let roster = merge_scan(&[], &scan("49-3 כהן יוסף 72", 7));
    let (merged, _) = merge_scan_at(&roster, &scan("493 כהן יוסף 72", 9), at(9));
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, roster[0].id);
    assert_eq!(merged[0].room.as_deref(), Some("493"));
}

#[test]
fn manual_task_survives_rescan_once() {
    let mut roster = merge_scan(&[], &scan(WARD, 7));
    roster[1]
        .tasks
        .push(Task::manual("לתאם שיחה עם המשפחה", Urgency::Routine));

    let (merged, _) = merge_scan_at(&roster, &scan(WARD, 9), at(9));
    let manual: Vec<&Task> = merged[1]
        .tasks
        .iter()
        .filter(|task| task.text == "לתאם שיחה עם המשפחה")
        .collect();
    assert_eq!(manual.len(), 1);

    let (again, _) = merge_scan_at(&merged, &scan(WARD, 11), at(11));
    assert_eq!(
        again[1]
            .tasks
            .iter()
            .filter(|task| task.text == "לתאם שיחה עם המשפחה")
            .count(),
        1
    );
}

#[test]
fn completed_extracted_task_stays_completed() {
    let mut roster = merge_scan(&[], &scan(WARD, 7));
    roster[0].tasks[0].complete(at(8));

    let (merged, _) = merge_scan_at(&roster, &scan(WARD, 9), at(9));
    let task = &merged[0].tasks[0];
    assert_eq!(task.text, "בדיקת דם בבוקר");
    assert!(task.done);
    assert_eq!(task.done_time, Some(at(8)));
}

#[test]
fn completed_generated_task_stays_completed_by_text() {
    let mut roster = merge_scan(&[], &scan(WARD, 7));
    let diabetic = &mut roster[2];
    let text = diabetic.generated_tasks[0].text.clone();
    diabetic.generated_tasks[0].complete(at(8));

    let rescanned = scan(WARD, 9);
    assert_ne!(rescanned[2].generated_tasks[0].id, roster[2].generated_tasks[0].id);

    let (merged, _) = merge_scan_at(&roster, &rescanned, at(9));
    let task = merged[2]
        .generated_tasks
        .iter()
        .find(|task| task.text == text)
        .expect("generated task regenerated");
    assert!(task.done);
    assert_eq!(task.done_time, Some(at(8)));
    assert!(merged[2].generated_tasks[1..].iter().all(|task| !task.done));
}

#[test]
fn unscanned_patients_are_retained_after_scanned_ones() {
    let roster = merge_scan(&[], &scan("צד א\n101 כהן יוסף 72", 7));
    let (merged, stats) = merge_scan_at(&roster, &scan("צד ב\n201 לוי שרה 65", 9), at(9));

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].name.as_deref(), Some("לוי שרה"));
    assert_eq!(merged[1].id, roster[0].id);
    assert_eq!(merged[1].scan_count, 1);
    assert_eq!(stats.retained, 1);
    assert_eq!(stats.added, 1);
}

#[test]
fn rescan_replaces_rule_output_when_diagnosis_changes() {
    let roster = merge_scan(&[], &scan("101 כהן יוסף 72 סוכרת", 7));
    let (merged, _) = merge_scan_at(&roster, &scan("101 כהן יוסף 72 CHF", 9), at(9));

    assert!(merged[0]
        .generated_tasks
        .iter()
        .all(|task| task.generated_from.as_deref() == Some("אי ספיקת לב")));
}

#[test]
fn rows_without_room_or_name_stay_distinct() {
    let parsed = scan("pneumonia RLL\nCHF exacerbation | CT ראש", 7);
    assert!(parsed.iter().all(|p| p.room.is_none() && p.name.is_none()));

    let (first, stats) = merge_scan_at(&[], &parsed, at(7));
    assert_eq!(first.len(), 2);
    assert_eq!(stats.added, 2);
    assert_eq!(stats.collapsed, 0);
    assert_eq!(first[0].diagnosis.as_deref(), Some("pneumonia RLL"));
    assert_eq!(first[1].tasks.len(), 1);

    let (second, _) = merge_scan_at(&first, &scan("CHF exacerbation", 9), at(9));
    assert_eq!(second.len(), 3);
    assert_ne!(second[0].id, first[1].id);
    assert_eq!(second[2].id, first[1].id);
    assert_eq!(second[2].tasks.len(), 1);
}
