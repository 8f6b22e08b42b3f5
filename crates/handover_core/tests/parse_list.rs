use chrono::{DateTime, TimeZone, Utc};
use handover_core::{
    parse_patient_list_with, ParseOptions, PatientEntry, Section, TaskCategory, TaskSource,
    Urgency,
};

fn scanned_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 6, 45, 0).unwrap()
}

fn parse(text: &str) -> Vec<PatientEntry> {
    parse_patient_list_with(text, &ParseOptions::at(scanned_at()))
}

#[test]
fn full_line_yields_all_fields() {
    let patients =
        parse("101 כהן יוסף 72 דלקת ריאות DNR NPO | משתחרר היום | בדיקת דם בבוקר");
    assert_eq!(patients.len(), 1);

    let patient = &patients[0];
    assert_eq!(patient.section, Section::SideA);
    assert_eq!(patient.date, "05/03/2024");
    assert_eq!(patient.room.as_deref(), Some("101"));
    assert_eq!(patient.name.as_deref(), Some("כהן יוסף"));
    assert_eq!(patient.age, Some(72));
    assert_eq!(patient.diagnosis.as_deref(), Some("דלקת ריאות"));
    assert_eq!(patient.flags, vec!["DNR".to_string(), "NPO".to_string()]);
    assert_eq!(patient.status, vec!["משתחרר היום".to_string()]);
    assert_eq!(patient.scanned_at, scanned_at());
    assert_eq!(patient.created_at, scanned_at());
    assert_eq!(patient.scan_count, 1);

    assert_eq!(patient.tasks.len(), 1);
    let task = &patient.tasks[0];
    assert_eq!(task.text, "בדיקת דם בבוקר");
    assert_eq!(task.source, TaskSource::Extracted);
    assert_eq!(task.urgency, Urgency::Morning);
    assert_eq!(task.category, Some(TaskCategory::Labs));
    assert!(!task.done);

    let sources: Vec<&str> = patient
        .generated_tasks
        .iter()
        .filter_map(|task| task.generated_from.as_deref())
        .collect();
    assert!(sources.contains(&"משתחרר היום"));
    assert!(sources.contains(&"NPO"));
    assert!(sources.contains(&"DNR/DNI"));
    assert!(sources.contains(&"זיהום"));
}

#[test]
fn headers_switch_section_and_are_not_patients() {
    let text = "צד א\n101 כהן יוסף 72\n\n  צד   ב  \n201 לוי שרה 65\nצד ג\n301 מזרחי דוד 80\nשיקום\n5 פרץ רחל 77";
    let patients = parse(text);
    let sections: Vec<Section> = patients.iter().map(|patient| patient.section).collect();
    assert_eq!(
        sections,
        vec![Section::SideA, Section::SideB, Section::SideC, Section::Rehab]
    );
}

#[test]
fn initial_section_applies_before_first_header() {
    let options = ParseOptions {
        initial_section: Section::SideC,
        ..ParseOptions::at(scanned_at())
    };
    let patients = parse_patient_list_with("301 מזרחי דוד 80\nצד א\n101 כהן יוסף 72", &options);
    assert_eq!(patients[0].section, Section::SideC);
    assert_eq!(patients[1].section, Section::SideA);
}

#[test]
fn room_formats_survive_verbatim() {
    let text = "49-3 כהן יוסף 70\n55/1 לוי שרה 65\n58/3 מזרחי דוד 81\nניטור-1 פרץ רחל 90\nניטור 1 אברהם משה 55\n101 גולן דנה 40";
    let rooms: Vec<Option<String>> = parse(text).into_iter().map(|patient| patient.room).collect();
    assert_eq!(
        rooms,
        ["49-3", "55/1", "58/3", "ניטור-1", "ניטור 1", "101"]
            .iter()
            .map(|room| Some(room.to_string()))
            .collect::<Vec<_>>()
    );
}

#[test]
fn missing_room_does_not_block_name() {
    let patients = parse("כהן יוסף 72 CHF");
    assert_eq!(patients[0].room, None);
    assert_eq!(patients[0].name.as_deref(), Some("כהן יוסף"));
    assert_eq!(patients[0].age, Some(72));
    assert_eq!(patients[0].diagnosis.as_deref(), Some("CHF"));
}

#[test]
fn implausible_age_is_left_in_diagnosis() {
    let patients = parse("101 כהן יוסף 250 מעקב");
    assert_eq!(patients[0].age, None);
    assert_eq!(patients[0].diagnosis.as_deref(), Some("250 מעקב"));
}

#[test]
fn bladder_scan_segment_is_a_procedure_task() {
    let patients = parse("101 כהן יוסף 72 | BS בערב");
    let task = &patients[0].tasks[0];
    assert_eq!(task.text, "BS בערב");
    assert_eq!(task.category, Some(TaskCategory::Procedure));
    assert!(patients[0]
        .generated_tasks
        .iter()
        .all(|task| task.generated_from.as_deref() != Some("סוכרת")));
}

#[test]
fn task_segment_carries_urgency_and_time() {
    let patients = parse("101 כהן יוסף 72 | צילום חזה דחוף 14:30 | ייעוץ קרדיולוגי");
    let tasks = &patients[0].tasks;
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].urgency, Urgency::Stat);
    assert_eq!(tasks[0].category, Some(TaskCategory::Imaging));
    assert_eq!(tasks[0].time.as_deref(), Some("14:30"));
    assert_eq!(tasks[1].category, Some(TaskCategory::Consult));
    assert_eq!(tasks[1].urgency, Urgency::Routine);
}

#[test]
fn flags_in_extra_segments_are_unioned_once() {
    let patients = parse("101 כהן יוסף 72 MRSA | בידוד מגע mrsa | c diff");
    assert_eq!(
        patients[0].flags,
        vec!["MRSA".to_string(), "C.DIFF".to_string()]
    );
}

#[test]
fn noise_lines_are_dropped() {
    let patients = parse("--\n..\nDNR NPO\n\n101 כהן יוסף 72");
    assert_eq!(patients.len(), 1);
}

#[test]
fn confidence_tracks_recognized_fields() {
    let patients = parse("101 כהן יוסף 72 דלקת ריאות\nכהן יוסף");
    assert!((patients[0].confidence - 1.0).abs() < 1e-9);
    assert!((patients[1].confidence - 0.45).abs() < 1e-9);
}
