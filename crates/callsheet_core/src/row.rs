//! Task ↔ row mapping for the row store.
//!
//! One worksheet row per task, header row fixed, id in the first column.
//! Trailing cells may be missing on rows written before a schema self-heal
//! added a column; they decode as empty.

use crate::codec;
use crate::error::{CallsheetError, Result};
use crate::task::{Task, TaskStatus, Visibility};

/// Task table columns, in order. `CalendarId` is the newest trailing column
/// and is backfilled by the schema manager on older sheets.
pub const TASK_COLUMNS: [&str; 16] = [
    "ID",
    "Title",
    "Status",
    "Area",
    "Month",
    "Week",
    "Responsible",
    "Notes",
    "ScheduledDate",
    "ScheduledTime",
    "Attachments",
    "Visibility",
    "VisibleTo",
    "MeetLink",
    "AttendeeResponses",
    "CalendarId",
];

pub fn header_row() -> Vec<String> {
    TASK_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub fn to_row(task: &Task) -> Vec<String> {
    vec![
        task.id.clone(),
        task.title.clone(),
        task.status.as_display().to_string(),
        task.area.clone(),
        task.month.clone(),
        task.week.clone(),
        task.responsible.join(","),
        task.notes.clone(),
        task.scheduled_date.clone().unwrap_or_default(),
        task.scheduled_time.clone().unwrap_or_default(),
        codec::encode_attachments(&task.attachments),
        task.visibility.as_str().to_string(),
        codec::encode_visible_to(&task.visible_to),
        task.meet_link.clone().unwrap_or_default(),
        codec::encode_attendee_responses(&task.attendee_responses),
        task.calendar_id.clone().unwrap_or_default(),
    ]
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn optional(row: &[String], idx: usize) -> Option<String> {
    let v = cell(row, idx).trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

pub fn from_row(row: &[String]) -> Result<Task> {
    let id = cell(row, 0).trim();
    if id.is_empty() {
        return Err(CallsheetError::validation("id", "row has a blank id cell"));
    }
    Ok(Task {
        id: id.to_string(),
        title: cell(row, 1).to_string(),
        status: TaskStatus::from_display(cell(row, 2)),
        area: cell(row, 3).to_string(),
        month: cell(row, 4).to_string(),
        week: cell(row, 5).to_string(),
        responsible: cell(row, 6)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        notes: cell(row, 7).to_string(),
        scheduled_date: optional(row, 8),
        scheduled_time: optional(row, 9),
        attachments: codec::decode_attachments(cell(row, 10))?,
        visibility: Visibility::from_cell(cell(row, 11)),
        visible_to: codec::decode_visible_to(cell(row, 12))?,
        meet_link: optional(row, 13),
        attendee_responses: codec::decode_attendee_responses(cell(row, 14))?,
        calendar_id: optional(row, 15),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Attachment, AttachmentKind};
    use chrono::{TimeZone, Utc};

    fn sample_task() -> Task {
        let mut task = Task::new("T1", "Kickoff")
            .with_schedule("2025-11-10", Some("09:00".into()))
            .with_status(TaskStatus::InProgress)
            .with_area("Production")
            .with_responsible(vec!["ana@crew.example".into(), "ben@crew.example".into()]);
        task.month = "November".into();
        task.week = "W46".into();
        task.notes = "Bring release forms".into();
        task.attachments = vec![Attachment {
            id: "a1".into(),
            name: "script-v3.pdf".into(),
            kind: AttachmentKind::File,
            url: "https://files.example/script-v3.pdf".into(),
            added_by: "ana@crew.example".into(),
            added_at: Utc.with_ymd_and_hms(2025, 11, 1, 8, 0, 0).unwrap(),
        }];
        task.visibility = Visibility::Department;
        task.visible_to = vec!["production".into()];
        task.calendar_id = Some("unit-b".into());
        task
    }

    #[test]
    fn row_roundtrip_preserves_every_field() {
        let task = sample_task();
        let row = to_row(&task);
        assert_eq!(row.len(), TASK_COLUMNS.len());
        assert_eq!(row[0], "T1");
        assert_eq!(row[2], "In Progress");
        let back = from_row(&row).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn short_rows_tolerate_missing_trailing_cells() {
        // A row written before the CalendarId column existed.
        let task = sample_task();
        let mut row = to_row(&task);
        row.truncate(15);
        let back = from_row(&row).unwrap();
        assert_eq!(back.calendar_id, None);
        assert_eq!(back.id, "T1");
    }

    #[test]
    fn blank_id_row_is_rejected() {
        let row = vec!["".to_string(), "Orphan".to_string()];
        let err = from_row(&row).unwrap_err();
        assert!(matches!(err, CallsheetError::Validation { ref field, .. } if field == "id"));
    }

    #[test]
    fn malformed_attachments_cell_surfaces_codec_error() {
        let task = sample_task();
        let mut row = to_row(&task);
        row[10] = "not-a-blob".into();
        let err = from_row(&row).unwrap_err();
        assert!(matches!(err, CallsheetError::Codec(_)));
    }
}
