//! Read-path merge of the two independently-mutable stores.
//!
//! The calendar is the trusted source on id collision: a user may have edited
//! the event directly in the calendar UI, and those edits win over the row
//! store. That policy means row-store edits to a scheduled task's status or
//! area can be overridden by stale calendar text; it is preserved here exactly
//! as the product behaves.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use callsheet_core::{from_row, Result, Task, Visibility};

use crate::calendar::{parse_description, CalendarApi, CalendarEvent, EventWindow, PROP_SOURCE};
use crate::rowstore::{RowStore, SheetTransport};
use crate::SyncConfig;

/// Reshape a tagged calendar event into a task-shaped record. Returns `None`
/// for events without the ownership tag or without a derivable schedule;
/// those belong to the "foreign calendar entries" category and are excluded
/// from the merge.
pub fn event_to_task(event: &CalendarEvent, cfg: &SyncConfig) -> Option<Task> {
    if !event.is_owned_by(&cfg.source_tag) {
        return None;
    }
    let task_id = event.task_id()?;
    let start_date = event.start.as_date()?;

    let parsed = parse_description(&event.description);
    Some(Task {
        id: task_id.to_string(),
        title: event.summary.clone(),
        status: parsed.status.unwrap_or_default(),
        area: parsed.area.unwrap_or_default(),
        responsible: parsed.responsible,
        notes: parsed.notes,
        scheduled_date: Some(start_date.format("%Y-%m-%d").to_string()),
        scheduled_time: event
            .start
            .date_time
            .map(|dt| dt.time().format("%H:%M").to_string()),
        visibility: Visibility::All,
        ..Default::default()
    })
}

/// One de-duplicated view over the row store and the tagged calendar events
/// in the window. Every calendar the row set references is read alongside the
/// primary, so tasks mirrored to override calendars are not invisible here.
/// Row-store order is preserved; calendar-only ids are appended; the calendar
/// version replaces the row version on collision.
pub async fn merged_view<T, C>(
    rows: &RowStore<T>,
    api: &C,
    cfg: &SyncConfig,
    window: EventWindow,
) -> Result<Vec<Task>>
where
    T: SheetTransport,
    C: CalendarApi + ?Sized,
{
    let mut tasks: Vec<Task> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut calendars: BTreeSet<String> = BTreeSet::new();
    calendars.insert(cfg.calendar_id.clone());

    for row in rows.list_all(&cfg.tasks_table).await? {
        match from_row(&row) {
            Ok(task) => {
                if let Some(id) = &task.calendar_id {
                    calendars.insert(id.clone());
                }
                index.insert(task.id.clone(), tasks.len());
                tasks.push(task);
            }
            Err(e) => {
                // One corrupt legacy row must not hide every other task; the
                // codec error is surfaced in the log instead of the result.
                warn!(id = %row.first().map(String::as_str).unwrap_or(""), error = %e,
                      "skipping undecodable task row");
            }
        }
    }

    let mut props = BTreeMap::new();
    props.insert(PROP_SOURCE.to_string(), cfg.source_tag.clone());

    for calendar_id in &calendars {
        let events = api.list_events(calendar_id, Some(window), &props).await?;
        for event in &events {
            let Some(mut task) = event_to_task(event, cfg) else {
                continue;
            };
            if calendar_id != &cfg.calendar_id {
                task.calendar_id = Some(calendar_id.clone());
            }
            match index.get(&task.id) {
                Some(&i) => tasks[i] = task,
                None => {
                    index.insert(task.id.clone(), tasks.len());
                    tasks.push(task);
                }
            }
        }
    }

    Ok(tasks)
}
