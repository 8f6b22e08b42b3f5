//! Scan-merge reconciliation.
//!
//! # Responsibility
//! - Fold a freshly parsed scan into the accumulated roster.
//! - Carry forward identity, manual tasks and completion state.
//!
//! # Invariants
//! - A matched patient keeps its original `id` and `created_at`.
//! - Manual tasks are never dropped by a rescan, unless the same text was
//!   re-extracted from the sheet.
//! - Completion state follows task text (trimmed, exact), not task id.
//! - Patients absent from the scan are retained verbatim.
//! - Output: processed incoming rows in scan order, then unmatched existing
//!   rows in roster order.

use crate::model::patient::{PatientEntry, PatientId};
use crate::model::task::{Task, TaskSource};
use chrono::{DateTime, Utc};
use log::info;
use std::collections::{HashMap, HashSet};

/// Copies completion state from `old` onto `new`; every other field is new.
fn carry_completion(old: &Task, new: &Task) -> Task {
    Task {
        done: old.done,
        done_time: old.done_time,
        ..new.clone()
    }
}

/// Extracted and manual tasks may stand in for each other; generated tasks
/// only match generated tasks.
fn same_task(a: &Task, b: &Task) -> bool {
    a.same_text(b)
        && (a.source == b.source
            || a.source == TaskSource::Extracted
            || b.source == TaskSource::Extracted)
}

fn reconcile(old: &[Task], incoming: &[Task]) -> Vec<Task> {
    incoming
        .iter()
        .map(|new| match old.iter().find(|prev| same_task(prev, new)) {
            Some(prev) => carry_completion(prev, new),
            None => new.clone(),
        })
        .collect()
}

/// Merges one matched pair; `new` supplies the scanned fields.
pub fn merge_patient(
    old: &PatientEntry,
    new: &PatientEntry,
    merged_at: DateTime<Utc>,
) -> PatientEntry {
    let mut tasks = reconcile(&old.tasks, &new.tasks);
    let manual_keep: Vec<Task> = old
        .tasks
        .iter()
        .filter(|task| task.source == TaskSource::Manual)
        .filter(|task| !tasks.iter().any(|merged| same_task(merged, task)))
        .cloned()
        .collect();
    tasks.extend(manual_keep);

    PatientEntry {
        id: old.id,
        tasks,
        generated_tasks: reconcile(&old.generated_tasks, &new.generated_tasks),
        created_at: old.created_at,
        updated_at: merged_at,
        scan_count: old.scan_count.saturating_add(1),
        ..new.clone()
    }
}

/// Merge counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub matched_strict: usize,
    pub matched_loose: usize,
    pub added: usize,
    pub retained: usize,
    pub collapsed: usize,
}

/// Merges `incoming` into `existing` using the current clock.
pub fn merge_scan(existing: &[PatientEntry], incoming: &[PatientEntry]) -> Vec<PatientEntry> {
    merge_scan_at(existing, incoming, Utc::now()).0
}

/// Merges `incoming` into `existing`, stamping matched rows with `merged_at`.
///
/// Matching tries the strict key (section + room + name) first and falls back
/// to the loose key (room + name), which detects a transfer between sections.
/// A row that appears twice in one scan is folded into its first occurrence.
/// Rows with neither room nor name have no identity: they are never matched
/// or folded, so each one is added as its own patient.
pub fn merge_scan_at(
    existing: &[PatientEntry],
    incoming: &[PatientEntry],
    merged_at: DateTime<Utc>,
) -> (Vec<PatientEntry>, MergeStats) {
    let mut by_strict: HashMap<String, usize> = HashMap::with_capacity(existing.len());
    let mut by_loose: HashMap<String, usize> = HashMap::with_capacity(existing.len());
    let identified = existing
        .iter()
        .enumerate()
        .filter(|(_, patient)| is_identified(patient));
    for (index, patient) in identified {
        by_strict.insert(patient.strict_key(), index);
        by_loose.insert(patient.loose_key(), index);
    }

    let mut stats = MergeStats::default();
    let mut consumed: HashSet<String> = HashSet::new();
    let mut merged: Vec<PatientEntry> = Vec::with_capacity(existing.len() + incoming.len());
    let mut slot_by_id: HashMap<PatientId, usize> = HashMap::new();
    let mut fresh_by_key: HashMap<String, usize> = HashMap::new();

    for new in incoming {
        if !is_identified(new) {
            slot_by_id.insert(new.id, merged.len());
            merged.push(new.clone());
            stats.added += 1;
            continue;
        }

        let strict_key = new.strict_key();
        let matched = match by_strict.get(&strict_key) {
            Some(&index) => Some((index, false)),
            None => by_loose.get(&new.loose_key()).map(|&index| (index, true)),
        };

        let Some((index, is_transfer)) = matched else {
            if let Some(&slot) = fresh_by_key.get(&strict_key) {
                fold_duplicate(&mut merged[slot], new, merged_at);
                stats.collapsed += 1;
            } else {
                fresh_by_key.insert(strict_key, merged.len());
                slot_by_id.insert(new.id, merged.len());
                merged.push(new.clone());
                stats.added += 1;
            }
            continue;
        };

        let old = &existing[index];
        consumed.insert(old.strict_key());
        if let Some(&slot) = slot_by_id.get(&old.id) {
            fold_duplicate(&mut merged[slot], new, merged_at);
            stats.collapsed += 1;
            continue;
        }

        if is_transfer {
            stats.matched_loose += 1;
        } else {
            stats.matched_strict += 1;
        }
        slot_by_id.insert(old.id, merged.len());
        merged.push(merge_patient(old, new, merged_at));
    }

    for patient in existing {
        if !consumed.contains(&patient.strict_key()) {
            merged.push(patient.clone());
            stats.retained += 1;
        }
    }

    info!(
        "event=scan_merge module=merge status=ok existing={} incoming={} matched_strict={} matched_loose={} added={} retained={} collapsed={} total={}",
        existing.len(),
        incoming.len(),
        stats.matched_strict,
        stats.matched_loose,
        stats.added,
        stats.retained,
        stats.collapsed,
        merged.len()
    );
    (merged, stats)
}

fn is_identified(patient: &PatientEntry) -> bool {
    patient.room.is_some() || patient.name.is_some()
}

/// Folds a repeated row of the same scan into the slot it already occupies.
fn fold_duplicate(slot: &mut PatientEntry, new: &PatientEntry, merged_at: DateTime<Utc>) {
    let scan_count = slot.scan_count;
    let mut folded = merge_patient(slot, new, merged_at);
    folded.scan_count = scan_count;
    *slot = folded;
}
