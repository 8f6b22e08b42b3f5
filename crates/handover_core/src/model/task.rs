//! Task domain model.
//!
//! # Responsibility
//! - Define the actionable/generated to-do attached to a patient.
//! - Provide completion lifecycle helpers that keep `done` and `done_time`
//!   consistent.
//!
//! # Invariants
//! - `id` is stable for the lifetime of one task object. Re-parsing creates a
//!   new task; the merger copies completion state forward by text.
//! - `done_time.is_some() == done`.
//! - `confidence` is within `[0, 1]`.
//! - `generated_from` is only set for `TaskSource::Generated`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Confidence assigned to tasks taken verbatim from a source segment.
pub const EXTRACTED_CONFIDENCE: f64 = 0.8;
/// Confidence assigned to rule-engine output.
pub const GENERATED_CONFIDENCE: f64 = 0.9;
/// Confidence assigned to user-entered tasks.
pub const MANUAL_CONFIDENCE: f64 = 1.0;

/// Task urgency.
///
/// Ordering is clinical priority: `Stat > Urgent > Morning > Routine`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Routine,
    Morning,
    Urgent,
    Stat,
}

impl Urgency {
    /// Wire name, e.g. `stat`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Morning => "morning",
            Self::Urgent => "urgent",
            Self::Stat => "stat",
        }
    }

    /// Parses a wire name case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "routine" => Some(Self::Routine),
            "morning" => Some(Self::Morning),
            "urgent" => Some(Self::Urgent),
            "stat" => Some(Self::Stat),
            _ => None,
        }
    }
}

/// Small execution-focused task grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Labs,
    Imaging,
    Meds,
    Consult,
    Procedure,
    Discharge,
    Other,
}

/// Originating mechanism of a task. Decides merge/retention behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Text came directly from a segment of the scanned sheet.
    Extracted,
    /// Added by a user action, never produced by parsing.
    Manual,
    /// Emitted by the rule engine from a keyword trigger.
    Generated,
}

/// Validation errors for task invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskValidationError {
    /// `done` and `done_time` disagree.
    CompletionMismatch { done: bool, has_done_time: bool },
    /// Confidence outside `[0, 1]` or not finite.
    ConfidenceOutOfRange(f64),
    /// `generated_from` set on a task that was not generated.
    UnexpectedGeneratedFrom(TaskSource),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CompletionMismatch {
                done,
                has_done_time,
            } => write!(
                f,
                "doneTime must be set iff done is true (done={done}, doneTime set={has_done_time})"
            ),
            Self::ConfidenceOutOfRange(value) => {
                write!(f, "confidence ({value}) must be within [0, 1]")
            }
            Self::UnexpectedGeneratedFrom(source) => {
                write!(f, "generatedFrom is only valid for generated tasks, got {source:?}")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// One to-do attached to a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskRecord")]
pub struct Task {
    pub id: TaskId,
    /// Exact text as written (extracted/manual) or templated (generated).
    pub text: String,
    pub urgency: Urgency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    pub source: TaskSource,
    pub done: bool,
    pub done_time: Option<DateTime<Utc>>,
    /// Time of day (`16:30`) detected in the text.
    pub time: Option<String>,
    pub confidence: f64,
    /// Rule label, e.g. `NPO`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_from: Option<String>,
}

impl Task {
    fn open(text: String, urgency: Urgency, source: TaskSource, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            urgency,
            category: None,
            source,
            done: false,
            done_time: None,
            time: None,
            confidence,
            generated_from: None,
        }
    }

    /// Creates a task whose text was taken from a scanned segment.
    pub fn extracted(
        text: impl Into<String>,
        urgency: Urgency,
        category: Option<TaskCategory>,
        time: Option<String>,
    ) -> Self {
        let mut task = Self::open(
            text.into(),
            urgency,
            TaskSource::Extracted,
            EXTRACTED_CONFIDENCE,
        );
        task.category = category;
        task.time = time;
        task
    }

    /// Creates a user-entered task.
    pub fn manual(text: impl Into<String>, urgency: Urgency) -> Self {
        Self::open(text.into(), urgency, TaskSource::Manual, MANUAL_CONFIDENCE)
    }

    /// Creates a rule-engine task tagged with its rule label.
    pub fn generated(text: impl Into<String>, urgency: Urgency, rule: impl Into<String>) -> Self {
        let mut task = Self::open(
            text.into(),
            urgency,
            TaskSource::Generated,
            GENERATED_CONFIDENCE,
        );
        task.generated_from = Some(rule.into());
        task
    }

    /// Marks the task done at `at`.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.done = true;
        self.done_time = Some(at);
    }

    /// Reopens the task and clears its completion timestamp.
    pub fn reopen(&mut self) {
        self.done = false;
        self.done_time = None;
    }

    /// Flips completion state; `at` is used only when completing.
    pub fn toggle(&mut self, at: DateTime<Utc>) {
        if self.done {
            self.reopen();
        } else {
            self.complete(at);
        }
    }

    /// Whether the task still needs doing.
    pub fn is_open(&self) -> bool {
        !self.done
    }

    /// Task identity used across rescans: trimmed text equality.
    pub fn same_text(&self, other: &Task) -> bool {
        self.text.trim() == other.text.trim()
    }

    /// Validates task invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.done != self.done_time.is_some() {
            return Err(TaskValidationError::CompletionMismatch {
                done: self.done,
                has_done_time: self.done_time.is_some(),
            });
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(TaskValidationError::ConfidenceOutOfRange(self.confidence));
        }
        if self.generated_from.is_some() && self.source != TaskSource::Generated {
            return Err(TaskValidationError::UnexpectedGeneratedFrom(self.source));
        }
        Ok(())
    }
}

/// Unchecked wire shape; converted through [`Task::validate`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    text: String,
    urgency: Urgency,
    #[serde(default)]
    category: Option<TaskCategory>,
    source: TaskSource,
    done: bool,
    #[serde(default)]
    done_time: Option<DateTime<Utc>>,
    #[serde(default)]
    time: Option<String>,
    confidence: f64,
    #[serde(default)]
    generated_from: Option<String>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskValidationError;

    fn try_from(value: TaskRecord) -> Result<Self, Self::Error> {
        let task = Self {
            id: value.id,
            text: value.text,
            urgency: value.urgency,
            category: value.category,
            source: value.source,
            done: value.done,
            done_time: value.done_time,
            time: value.time,
            confidence: value.confidence,
            generated_from: value.generated_from,
        };
        task.validate()?;
        Ok(task)
    }
}
