//! Idempotent task → calendar-event mirroring.
//!
//! The target event id is recomputed from the task id alone, so repeating an
//! upsert can only ever touch the same event: the first call creates it, every
//! later call updates it in place.

use chrono::{Days, Duration};
use tracing::debug;

use callsheet_core::{to_event_id, CallsheetError, Result, Task};

use crate::calendar::{
    encode_description, CalendarApi, CalendarError, CalendarEvent, EventTime, PROP_SOURCE,
    PROP_TASK_ID,
};
use crate::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// Task has no `scheduled_date`; nothing was written.
    Skipped,
}

/// Build the mirrored event body for a task, or `None` when the task is not
/// calendar-eligible. Timed events span one hour; all-day events span one day.
pub fn build_event(task: &Task, cfg: &SyncConfig) -> Result<Option<CalendarEvent>> {
    let Some(date) = task.scheduled_date_parsed()? else {
        return Ok(None);
    };
    let (start, end) = match task.scheduled_time_parsed()? {
        Some(time) => {
            let start = date.and_time(time);
            (
                EventTime::timed(start, cfg.time_zone.clone()),
                EventTime::timed(start + Duration::hours(1), cfg.time_zone.clone()),
            )
        }
        None => (
            EventTime::all_day(date),
            EventTime::all_day(date + Days::new(1)),
        ),
    };

    let mut event = CalendarEvent {
        id: to_event_id(&task.id),
        summary: task.title.clone(),
        description: encode_description(task),
        start,
        end,
        ..Default::default()
    };
    event
        .private_props
        .insert(PROP_SOURCE.to_string(), cfg.source_tag.clone());
    event
        .private_props
        .insert(PROP_TASK_ID.to_string(), task.id.clone());
    Ok(Some(event))
}

/// Upsert the calendar mirror of one task: patch in place, falling back to an
/// explicit insert with the same id when the event does not exist yet.
///
/// Collision guard: if the derived event id already belongs to a different
/// task (digest-truncation collision) or to an event without our ownership
/// tag, the upsert fails instead of overwriting it.
pub async fn upsert<C>(api: &C, cfg: &SyncConfig, task: &Task) -> Result<UpsertOutcome>
where
    C: CalendarApi + ?Sized,
{
    let Some(event) = build_event(task, cfg)? else {
        debug!(task_id = %task.id, "task has no schedule, skipping upsert");
        return Ok(UpsertOutcome::Skipped);
    };
    let calendar_id = cfg.calendar_for(task);

    match api.get_event(&calendar_id, &event.id).await {
        Ok(Some(existing)) => {
            let owned = existing.is_owned_by(&cfg.source_tag)
                && existing.task_id() == Some(task.id.as_str());
            if !owned {
                return Err(CallsheetError::Collision {
                    task_id: task.id.clone(),
                    event_id: event.id,
                });
            }
        }
        Ok(None) => {}
        Err(e) => return Err(tag_task(e, &task.id)),
    }

    match api.patch_event(&calendar_id, event.clone()).await {
        Ok(_) => Ok(UpsertOutcome::Updated),
        Err(CalendarError::NotFound(_)) => match api.insert_event(&calendar_id, event).await {
            Ok(_) => Ok(UpsertOutcome::Created),
            Err(e) => Err(tag_task(e, &task.id)),
        },
        Err(e) => Err(tag_task(e, &task.id)),
    }
}

/// Tag a calendar failure with the task id so batch callers can report
/// per-item failures without aborting the whole batch.
fn tag_task(e: CalendarError, task_id: &str) -> CallsheetError {
    CallsheetError::external("calendar", format!("task {task_id}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;

    fn cfg() -> SyncConfig {
        SyncConfig {
            time_zone: "Europe/Madrid".to_string(),
            ..Default::default()
        }
    }

    fn timed_task() -> Task {
        Task::new("T1", "Kickoff").with_schedule("2025-11-10", Some("09:00".into()))
    }

    #[test]
    fn timed_event_spans_one_hour() {
        let event = build_event(&timed_task(), &cfg()).unwrap().unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["start"]["dateTime"], "2025-11-10T09:00:00");
        assert_eq!(json["end"]["dateTime"], "2025-11-10T10:00:00");
        assert_eq!(json["start"]["timeZone"], "Europe/Madrid");
        assert_eq!(event.task_id(), Some("T1"));
        assert!(event.is_owned_by("callsheet"));
    }

    #[test]
    fn all_day_event_spans_one_day() {
        let task = Task::new("T2", "Scout day").with_schedule("2025-11-12", None);
        let event = build_event(&task, &cfg()).unwrap().unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["start"]["date"], "2025-11-12");
        assert_eq!(json["end"]["date"], "2025-11-13");
        assert!(json["start"].get("dateTime").is_none());
    }

    #[test]
    fn unscheduled_task_builds_no_event() {
        let task = Task::new("T3", "Someday");
        assert!(build_event(&task, &cfg()).unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_twice_creates_once_then_updates() {
        let cal = InMemoryCalendar::new();
        let cfg = cfg();
        let task = timed_task();

        assert_eq!(upsert(&cal, &cfg, &task).await.unwrap(), UpsertOutcome::Created);
        assert_eq!(upsert(&cal, &cfg, &task).await.unwrap(), UpsertOutcome::Updated);
        assert_eq!(cal.event_count("primary").await, 1);
    }

    #[tokio::test]
    async fn upsert_skips_unscheduled_tasks() {
        let cal = InMemoryCalendar::new();
        let task = Task::new("T3", "Someday");
        assert_eq!(
            upsert(&cal, &cfg(), &task).await.unwrap(),
            UpsertOutcome::Skipped
        );
        assert_eq!(cal.event_count("primary").await, 0);
    }

    #[tokio::test]
    async fn upsert_respects_per_task_calendar() {
        let cal = InMemoryCalendar::new();
        let mut task = timed_task();
        task.calendar_id = Some("unit-b".to_string());
        upsert(&cal, &cfg(), &task).await.unwrap();
        assert_eq!(cal.event_count("primary").await, 0);
        assert_eq!(cal.event_count("unit-b").await, 1);
    }

    #[tokio::test]
    async fn collision_with_foreign_event_is_rejected() {
        let cal = InMemoryCalendar::new();
        let cfg = cfg();
        let task = timed_task();

        // Another task (or a user) already owns the derived event id.
        let mut squatter = build_event(&task, &cfg).unwrap().unwrap();
        squatter
            .private_props
            .insert(PROP_TASK_ID.to_string(), "T-other".to_string());
        cal.seed("primary", squatter).await;

        let err = upsert(&cal, &cfg, &task).await.unwrap_err();
        assert!(matches!(err, CallsheetError::Collision { ref task_id, .. } if task_id == "T1"));
    }
}
