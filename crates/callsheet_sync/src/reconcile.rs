//! Orphan reconciliation: a full-sweep compensating pass that removes
//! engine-owned calendar events whose task no longer exists or is no longer
//! scheduled. Untagged events are never listed, read, or touched.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{info, warn};

use callsheet_core::Result;

use crate::calendar::{CalendarApi, CalendarError, EventWindow, PROP_SOURCE};
use crate::SyncConfig;

#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub event_id: String,
    pub task_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Tagged events examined.
    pub scanned: usize,
    /// Orphan events removed.
    pub deleted: usize,
    /// Per-event delete failures; successes stay committed.
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete every tagged event whose embedded task id is not in
/// `authoritative_ids`. The sweep covers the primary calendar plus every
/// calendar in `extra_calendars`; callers pass the per-task override
/// calendars the row set references (including rows just deleted), so an
/// event mirrored to an override calendar obeys the same lifecycle as one on
/// the primary. Per-event failures are logged and collected, not fatal; the
/// pass is idempotent and safe to retry.
pub async fn reconcile<C>(
    api: &C,
    cfg: &SyncConfig,
    authoritative_ids: &HashSet<String>,
    extra_calendars: &BTreeSet<String>,
    window: Option<EventWindow>,
) -> Result<ReconcileReport>
where
    C: CalendarApi + ?Sized,
{
    let mut props = BTreeMap::new();
    props.insert(PROP_SOURCE.to_string(), cfg.source_tag.clone());

    let mut calendars: BTreeSet<&str> = extra_calendars.iter().map(String::as_str).collect();
    calendars.insert(&cfg.calendar_id);

    let mut report = ReconcileReport::default();
    for calendar_id in calendars {
        let events = api.list_events(calendar_id, window, &props).await?;
        report.scanned += events.len();

        for event in events {
            // Defensive: the list is already tag-filtered, but never delete
            // anything we cannot positively attribute to a task.
            let Some(task_id) = event.task_id().map(str::to_string) else {
                warn!(event_id = %event.id, "tagged event without a task id, leaving it alone");
                continue;
            };
            if authoritative_ids.contains(&task_id) {
                continue;
            }
            match api.delete_event(calendar_id, &event.id).await {
                Ok(()) => report.deleted += 1,
                // Already gone: someone else cleaned it up first.
                Err(CalendarError::NotFound(_)) => report.deleted += 1,
                Err(e) => {
                    warn!(
                        calendar_id,
                        event_id = %event.id,
                        task_id = %task_id,
                        error = %e,
                        "orphan delete failed"
                    );
                    report.failures.push(ReconcileFailure {
                        event_id: event.id,
                        task_id,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    info!(
        scanned = report.scanned,
        deleted = report.deleted,
        failed = report.failures.len(),
        "reconcile pass finished"
    );
    Ok(report)
}
