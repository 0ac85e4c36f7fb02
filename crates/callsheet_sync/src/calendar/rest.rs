//! REST calendar transport against a Calendar-v3-shaped events API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{CalendarApi, CalendarError, CalendarEvent, EventTime, EventWindow};

pub struct RestCalendar {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

/// Wire shape: the ownership tag travels in `extendedProperties.private`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extended_properties: Option<WireExtendedProps>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireExtendedProps {
    #[serde(default)]
    private: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEventList {
    #[serde(default)]
    items: Vec<WireEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl From<CalendarEvent> for WireEvent {
    fn from(event: CalendarEvent) -> Self {
        let extended_properties = if event.private_props.is_empty() {
            None
        } else {
            Some(WireExtendedProps {
                private: event.private_props,
            })
        };
        Self {
            id: event.id,
            summary: event.summary,
            description: event.description,
            start: event.start,
            end: event.end,
            extended_properties,
        }
    }
}

impl From<WireEvent> for CalendarEvent {
    fn from(wire: WireEvent) -> Self {
        Self {
            id: wire.id,
            summary: wire.summary,
            description: wire.description,
            start: wire.start,
            end: wire.end,
            private_props: wire.extended_properties.map(|p| p.private).unwrap_or_default(),
        }
    }
}

impl RestCalendar {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn events_url(&self, calendar_id: &str, suffix: &str) -> String {
        format!(
            "{}/calendars/{}/events{}",
            self.base_url.trim_end_matches('/'),
            calendar_id,
            suffix
        )
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        subject: &str,
    ) -> Result<(StatusCode, String), CalendarError> {
        let response = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| CalendarError::Service(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CalendarError::Service(e.to_string()))?;
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(CalendarError::NotFound(subject.to_string()))
            }
            StatusCode::CONFLICT => Err(CalendarError::Conflict(subject.to_string())),
            s if s.is_success() => Ok((status, text)),
            s => Err(CalendarError::Service(format!("{s}: {text}"))),
        }
    }

    fn parse_event(text: &str) -> Result<CalendarEvent, CalendarError> {
        let wire: WireEvent =
            serde_json::from_str(text).map_err(|e| CalendarError::Service(e.to_string()))?;
        Ok(wire.into())
    }
}

#[async_trait]
impl CalendarApi for RestCalendar {
    async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<Option<CalendarEvent>, CalendarError> {
        let url = self.events_url(calendar_id, &format!("/{event_id}"));
        match self.send(self.client.get(&url), event_id).await {
            Ok((_, text)) => Ok(Some(Self::parse_event(&text)?)),
            Err(CalendarError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert_event(
        &self,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent, CalendarError> {
        let url = self.events_url(calendar_id, "");
        let id = event.id.clone();
        let wire: WireEvent = event.into();
        let (_, text) = self.send(self.client.post(&url).json(&wire), &id).await?;
        Self::parse_event(&text)
    }

    async fn patch_event(
        &self,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent, CalendarError> {
        let url = self.events_url(calendar_id, &format!("/{}", event.id));
        let id = event.id.clone();
        let wire: WireEvent = event.into();
        let (_, text) = self.send(self.client.patch(&url).json(&wire), &id).await?;
        Self::parse_event(&text)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let url = self.events_url(calendar_id, &format!("/{event_id}"));
        self.send(self.client.delete(&url), event_id).await?;
        Ok(())
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        window: Option<EventWindow>,
        private_props: &BTreeMap<String, String>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = self.events_url(calendar_id, "");
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query: Vec<(String, String)> = private_props
                .iter()
                .map(|(k, v)| ("privateExtendedProperty".to_string(), format!("{k}={v}")))
                .collect();
            query.push(("singleEvents".to_string(), "true".to_string()));
            query.push(("maxResults".to_string(), "2500".to_string()));
            if let Some(w) = window {
                query.push(("timeMin".to_string(), format!("{}T00:00:00Z", w.start)));
                query.push(("timeMax".to_string(), format!("{}T00:00:00Z", w.end)));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken".to_string(), token.clone()));
            }
            let (_, text) = self
                .send(self.client.get(&url).query(&query), calendar_id)
                .await?;
            let page: WireEventList =
                serde_json::from_str(&text).map_err(|e| CalendarError::Service(e.to_string()))?;
            events.extend(page.items.into_iter().map(CalendarEvent::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{PROP_SOURCE, PROP_TASK_ID};
    use chrono::NaiveDate;

    #[test]
    fn wire_event_roundtrip_keeps_the_tag() {
        let d = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let mut event = CalendarEvent {
            id: "cstaskabc".into(),
            summary: "Kickoff".into(),
            description: "Status: Pending".into(),
            start: EventTime::timed(d.and_hms_opt(9, 0, 0).unwrap(), "Europe/Madrid"),
            end: EventTime::timed(d.and_hms_opt(10, 0, 0).unwrap(), "Europe/Madrid"),
            ..Default::default()
        };
        event.private_props.insert(PROP_SOURCE.into(), "callsheet".into());
        event.private_props.insert(PROP_TASK_ID.into(), "T1".into());

        let wire: WireEvent = event.clone().into();
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["start"]["dateTime"], "2025-11-10T09:00:00");
        assert_eq!(json["start"]["timeZone"], "Europe/Madrid");
        assert_eq!(json["extendedProperties"]["private"]["task_id"], "T1");

        let back: CalendarEvent = serde_json::from_value::<WireEvent>(json).unwrap().into();
        assert_eq!(back, event);
    }

    #[test]
    fn untagged_wire_event_has_empty_props() {
        let text = r#"{"id":"e1","summary":"Lunch","start":{"date":"2025-11-10"},"end":{"date":"2025-11-11"}}"#;
        let event = RestCalendar::parse_event(text).unwrap();
        assert!(event.private_props.is_empty());
        assert_eq!(event.task_id(), None);
    }
}
