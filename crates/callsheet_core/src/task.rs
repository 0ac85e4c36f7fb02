//! Task domain model: the unit of synchronization between the row store and
//! the calendar mirror.

use std::collections::BTreeMap;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CallsheetError, Result};

/// Status of a task (stored as a display string in the row store and in the
/// calendar event description).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_display(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Blocked => "Blocked",
        }
    }

    /// Parse the display string back out of a cell or description line.
    /// Unknown values fall back to `Pending`.
    pub fn from_display(s: &str) -> TaskStatus {
        match s.trim() {
            "In Progress" => TaskStatus::InProgress,
            "Completed" => TaskStatus::Completed,
            "Blocked" => TaskStatus::Blocked,
            _ => TaskStatus::Pending,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_display())
    }
}

/// Who can see a task. `visible_to` is only meaningful for `Department` and
/// `Individual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    All,
    Department,
    Individual,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Department => "department",
            Visibility::Individual => "individual",
        }
    }

    pub fn from_cell(s: &str) -> Visibility {
        match s.trim() {
            "department" => Visibility::Department,
            "individual" => Visibility::Individual,
            _ => Visibility::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    File,
    Link,
}

/// A file or link attached to a task, serialized as a structured blob in the
/// `Attachments` cell.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub kind: AttachmentKind,
    pub url: String,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

/// A production task. `id` is globally unique, immutable once created, and is
/// the primary key in the row store.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub week: String,
    /// Ordered set of user ids or emails; duplicates removed on write.
    #[serde(default)]
    pub responsible: Vec<String>,
    #[serde(default)]
    pub notes: String,
    /// `YYYY-MM-DD`. Presence makes the task calendar-eligible.
    #[serde(default)]
    pub scheduled_date: Option<String>,
    /// `HH:MM`, 24-hour. Absence makes a scheduled task an all-day event.
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub visible_to: Vec<String>,
    /// Populated by calendar-side enrichment, never written by callers.
    #[serde(default)]
    pub meet_link: Option<String>,
    #[serde(default)]
    pub attendee_responses: BTreeMap<String, String>,
    /// Which named calendar the event belongs to; `None` means the configured
    /// primary.
    #[serde(default)]
    pub calendar_id: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_schedule(mut self, date: impl Into<String>, time: Option<String>) -> Self {
        self.scheduled_date = Some(date.into());
        self.scheduled_time = time;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    pub fn with_responsible(mut self, responsible: Vec<String>) -> Self {
        self.responsible = responsible;
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_date.is_some()
    }

    pub fn scheduled_date_parsed(&self) -> Result<Option<NaiveDate>> {
        match &self.scheduled_date {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| {
                    CallsheetError::validation(
                        "scheduled_date",
                        format!("`{raw}` is not a YYYY-MM-DD date"),
                    )
                }),
        }
    }

    pub fn scheduled_time_parsed(&self) -> Result<Option<NaiveTime>> {
        match &self.scheduled_time {
            None => Ok(None),
            Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M")
                .map(Some)
                .map_err(|_| {
                    CallsheetError::validation(
                        "scheduled_time",
                        format!("`{raw}` is not a 24-hour HH:MM time"),
                    )
                }),
        }
    }

    /// Remove duplicate `responsible` entries, preserving first-seen order.
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.responsible.retain(|r| seen.insert(r.clone()));
    }

    /// Field-level validation, run before any write reaches the row store.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CallsheetError::validation("title", "title must not be empty"));
        }
        self.scheduled_date_parsed()?;
        self.scheduled_time_parsed()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ] {
            assert_eq!(TaskStatus::from_display(status.as_display()), status);
        }
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(TaskStatus::from_display("On Hold"), TaskStatus::Pending);
    }

    #[test]
    fn empty_title_is_rejected() {
        let task = Task::new("T1", "   ");
        let err = task.validate().unwrap_err();
        assert!(matches!(err, CallsheetError::Validation { ref field, .. } if field == "title"));
    }

    #[test]
    fn bad_time_is_rejected() {
        let task = Task::new("T1", "Kickoff").with_schedule("2025-11-10", Some("25:61".into()));
        let err = task.validate().unwrap_err();
        assert!(
            matches!(err, CallsheetError::Validation { ref field, .. } if field == "scheduled_time")
        );
    }

    #[test]
    fn bad_date_is_rejected() {
        let task = Task::new("T1", "Kickoff").with_schedule("Nov 10", None);
        let err = task.validate().unwrap_err();
        assert!(
            matches!(err, CallsheetError::Validation { ref field, .. } if field == "scheduled_date")
        );
    }

    #[test]
    fn valid_schedule_passes() {
        let task = Task::new("T1", "Kickoff").with_schedule("2025-11-10", Some("09:00".into()));
        task.validate().unwrap();
        assert!(task.is_scheduled());
    }

    #[test]
    fn normalize_dedups_responsible_keeping_order() {
        let mut task = Task::new("T1", "Kickoff").with_responsible(vec![
            "ana@crew.example".into(),
            "ben@crew.example".into(),
            "ana@crew.example".into(),
        ]);
        task.normalize();
        assert_eq!(task.responsible, vec!["ana@crew.example", "ben@crew.example"]);
    }
}
