//! In-memory calendar for tests and local runs, with the same not-found /
//! conflict semantics as the REST transport.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CalendarApi, CalendarError, CalendarEvent, EventWindow};

#[derive(Default)]
pub struct InMemoryCalendar {
    // calendar id → event id → event
    calendars: RwLock<HashMap<String, BTreeMap<String, CalendarEvent>>>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event directly, bypassing insert semantics. For tests that
    /// need user-created (untagged) or stale events.
    pub async fn seed(&self, calendar_id: &str, event: CalendarEvent) {
        self.calendars
            .write()
            .await
            .entry(calendar_id.to_string())
            .or_default()
            .insert(event.id.clone(), event);
    }

    pub async fn event_count(&self, calendar_id: &str) -> usize {
        self.calendars
            .read()
            .await
            .get(calendar_id)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

fn matches_props(event: &CalendarEvent, wanted: &BTreeMap<String, String>) -> bool {
    wanted
        .iter()
        .all(|(k, v)| event.private_props.get(k) == Some(v))
}

fn in_window(event: &CalendarEvent, window: Option<EventWindow>) -> bool {
    match window {
        None => true,
        Some(w) => event.start.as_date().map(|d| w.contains(d)).unwrap_or(false),
    }
}

#[async_trait]
impl CalendarApi for InMemoryCalendar {
    async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<Option<CalendarEvent>, CalendarError> {
        Ok(self
            .calendars
            .read()
            .await
            .get(calendar_id)
            .and_then(|events| events.get(event_id))
            .cloned())
    }

    async fn insert_event(
        &self,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent, CalendarError> {
        let mut calendars = self.calendars.write().await;
        let events = calendars.entry(calendar_id.to_string()).or_default();
        if events.contains_key(&event.id) {
            return Err(CalendarError::Conflict(event.id));
        }
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn patch_event(
        &self,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent, CalendarError> {
        let mut calendars = self.calendars.write().await;
        let events = calendars.entry(calendar_id.to_string()).or_default();
        match events.get_mut(&event.id) {
            Some(slot) => {
                *slot = event.clone();
                Ok(event)
            }
            None => Err(CalendarError::NotFound(event.id)),
        }
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let mut calendars = self.calendars.write().await;
        let removed = calendars
            .get_mut(calendar_id)
            .and_then(|events| events.remove(event_id));
        match removed {
            Some(_) => Ok(()),
            None => Err(CalendarError::NotFound(event_id.to_string())),
        }
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        window: Option<EventWindow>,
        private_props: &BTreeMap<String, String>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self
            .calendars
            .read()
            .await
            .get(calendar_id)
            .map(|events| {
                events
                    .values()
                    .filter(|e| matches_props(e, private_props) && in_window(e, window))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::EventTime;
    use chrono::NaiveDate;

    fn event(id: &str, date: (i32, u32, u32)) -> CalendarEvent {
        let d = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        CalendarEvent {
            id: id.to_string(),
            summary: format!("event {id}"),
            start: EventTime::all_day(d),
            end: EventTime::all_day(d.succ_opt().unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_twice_conflicts() {
        let cal = InMemoryCalendar::new();
        cal.insert_event("primary", event("e1", (2025, 11, 10)))
            .await
            .unwrap();
        let err = cal
            .insert_event("primary", event("e1", (2025, 11, 10)))
            .await
            .unwrap_err();
        assert!(matches!(err, CalendarError::Conflict(_)));
    }

    #[tokio::test]
    async fn patch_of_missing_event_is_not_found() {
        let cal = InMemoryCalendar::new();
        let err = cal
            .patch_event("primary", event("e1", (2025, 11, 10)))
            .await
            .unwrap_err();
        assert!(matches!(err, CalendarError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_by_window_and_props() {
        let cal = InMemoryCalendar::new();
        let mut tagged = event("e1", (2025, 11, 10));
        tagged
            .private_props
            .insert("source".to_string(), "callsheet".to_string());
        cal.seed("primary", tagged).await;
        cal.seed("primary", event("e2", (2025, 11, 12))).await;
        cal.seed("primary", event("e3", (2026, 1, 5))).await;

        let mut props = BTreeMap::new();
        props.insert("source".to_string(), "callsheet".to_string());
        let window = EventWindow::new(
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
        );

        let tagged_only = cal
            .list_events("primary", Some(window), &props)
            .await
            .unwrap();
        assert_eq!(tagged_only.len(), 1);
        assert_eq!(tagged_only[0].id, "e1");

        let all_in_window = cal
            .list_events("primary", Some(window), &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(all_in_window.len(), 2);
    }
}
