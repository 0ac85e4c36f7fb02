//! Calendar-service port and event body types.

pub mod description;
pub mod memory;
pub mod rest;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use callsheet_core::CallsheetError;

pub use description::{encode_description, parse_description, ParsedDescription};
pub use memory::InMemoryCalendar;
pub use rest::RestCalendar;

/// Private-metadata key naming the system that owns an event.
pub const PROP_SOURCE: &str = "source";
/// Private-metadata key carrying the owning task id.
pub const PROP_TASK_ID: &str = "task_id";

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("event not found: {0}")]
    NotFound(String),

    #[error("event already exists: {0}")]
    Conflict(String),

    #[error("request failed: {0}")]
    Service(String),
}

impl From<CalendarError> for CallsheetError {
    fn from(e: CalendarError) -> Self {
        CallsheetError::external("calendar", e.to_string())
    }
}

/// Event start/end: exactly one of `date` (all-day) or `date_time` (timed) is
/// set; `time_zone` accompanies timed values.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn timed(date_time: NaiveDateTime, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time),
            time_zone: Some(time_zone.into()),
            ..Default::default()
        }
    }

    /// Calendar-date of this boundary, whichever representation is set.
    pub fn as_date(&self) -> Option<NaiveDate> {
        self.date.or_else(|| self.date_time.map(|dt| dt.date()))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
    /// Event-private metadata; carries the ownership tag.
    #[serde(default)]
    pub private_props: BTreeMap<String, String>,
}

impl CalendarEvent {
    /// Owning task id, if the event carries the tag.
    pub fn task_id(&self) -> Option<&str> {
        self.private_props.get(PROP_TASK_ID).map(String::as_str)
    }

    /// Whether this event is owned by the engine identified by `source_tag`.
    pub fn is_owned_by(&self, source_tag: &str) -> bool {
        self.private_props.get(PROP_SOURCE).map(String::as_str) == Some(source_tag)
    }
}

/// Half-open date window `[start, end)` used to scope reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EventWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Calendar service operations the engine needs. Every call is a network
/// round-trip and may block on I/O; callers apply request-level timeouts.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<Option<CalendarEvent>, CalendarError>;

    /// Create an event with a caller-supplied id. `Conflict` if the id exists.
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent, CalendarError>;

    /// In-place update. `NotFound` if the id does not exist.
    async fn patch_event(
        &self,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent, CalendarError>;

    /// `NotFound` if the id does not exist.
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError>;

    /// Events whose private metadata contains every `private_props` pair,
    /// optionally restricted to a date window.
    async fn list_events(
        &self,
        calendar_id: &str,
        window: Option<EventWindow>,
        private_props: &BTreeMap<String, String>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_time_date_extraction() {
        let d = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        assert_eq!(EventTime::all_day(d).as_date(), Some(d));
        let timed = EventTime::timed(d.and_hms_opt(9, 0, 0).unwrap(), "Europe/Madrid");
        assert_eq!(timed.as_date(), Some(d));
        assert_eq!(EventTime::default().as_date(), None);
    }

    #[test]
    fn ownership_tag_checks() {
        let mut event = CalendarEvent {
            id: "e1".into(),
            summary: "Kickoff".into(),
            ..Default::default()
        };
        assert!(!event.is_owned_by("callsheet"));
        assert_eq!(event.task_id(), None);

        event.private_props.insert(PROP_SOURCE.into(), "callsheet".into());
        event.private_props.insert(PROP_TASK_ID.into(), "T1".into());
        assert!(event.is_owned_by("callsheet"));
        assert!(!event.is_owned_by("other-system"));
        assert_eq!(event.task_id(), Some("T1"));
    }

    #[test]
    fn window_is_half_open() {
        let w = EventWindow::new(
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
        );
        assert!(w.contains(NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()));
        assert!(w.contains(NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()));
    }
}
