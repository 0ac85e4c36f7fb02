//! The task service: the one write path front-ends are allowed to use.
//!
//! Ordering contract: the row store commits first, then the calendar mirror
//! is updated best-effort. A mirror failure never rolls back the row write;
//! it degrades to a `SyncStatus` the caller can surface, and cleanup that
//! must eventually happen goes through the reconcile outbox.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use callsheet_core::{from_row, to_row, CallsheetError, Result, Task};
use callsheet_sync::{
    merged_view, reconcile, upsert, CalendarApi, EventWindow, ReconcileReport, RowStore,
    SchemaManager, SheetTransport, SyncConfig, UpsertOutcome,
};

use crate::config::ServiceConfig;
use crate::outbox::{JobId, JobStatus, ReconcileQueue};

/// What happened on the calendar side of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// The mirror is up to date.
    Synced(UpsertOutcome),
    /// The row write committed but the mirror did not; the message says why.
    Degraded(String),
}

#[derive(Debug)]
pub struct TaskWriteResult {
    pub task: Task,
    pub sync: SyncStatus,
    /// Set when the write queued a reconcile sweep (schedule removed).
    pub reconcile_job: Option<JobId>,
}

/// Outcome of a full `sync_now` sweep.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub upserted: usize,
    pub skipped: usize,
    /// Per-task mirror failures; the sweep continues past them.
    pub failures: Vec<(String, String)>,
    pub reconcile: ReconcileReport,
}

pub struct TaskService<T> {
    rows: RowStore<T>,
    schema: SchemaManager<T>,
    calendar: Arc<dyn CalendarApi>,
    sync_cfg: SyncConfig,
    outbox: ReconcileQueue,
}

impl<T: SheetTransport> TaskService<T> {
    pub fn new(transport: Arc<T>, calendar: Arc<dyn CalendarApi>, cfg: ServiceConfig) -> Self {
        let sync_cfg = cfg.sync_config();
        let schema = SchemaManager::with_defaults(Arc::clone(&transport), &cfg.tasks_table);
        let outbox = ReconcileQueue::spawn(Arc::clone(&calendar), sync_cfg.clone(), cfg.retry);
        Self {
            rows: RowStore::new(transport),
            schema,
            calendar,
            sync_cfg,
            outbox,
        }
    }

    /// Provision missing tables and backfill trailing columns. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.schema.ensure_schema().await
    }

    /// Create a task. A blank id gets a fresh UUID; an id that already exists
    /// turns the call into an update so retried requests cannot duplicate
    /// rows.
    pub async fn create_task(&self, mut task: Task) -> Result<TaskWriteResult> {
        task.normalize();
        if task.id.trim().is_empty() {
            task.id = Uuid::new_v4().to_string();
        }
        task.validate()?;

        if self
            .rows
            .get_by_id(&self.sync_cfg.tasks_table, &task.id)
            .await?
            .is_some()
        {
            info!(task_id = %task.id, "create for an existing id, updating in place");
            return self.update_task(task).await;
        }

        self.rows
            .append(&self.sync_cfg.tasks_table, to_row(&task))
            .await?;
        let sync = self.mirror(&task).await;
        Ok(TaskWriteResult {
            task,
            sync,
            reconcile_job: None,
        })
    }

    /// Update an existing task. `NotFound` if the id is absent. Removing the
    /// schedule queues a reconcile sweep to reap the now-orphaned event.
    pub async fn update_task(&self, mut task: Task) -> Result<TaskWriteResult> {
        task.normalize();
        task.validate()?;

        let previous = self
            .rows
            .get_by_id(&self.sync_cfg.tasks_table, &task.id)
            .await?
            .ok_or_else(|| CallsheetError::NotFound(task.id.clone()))?;
        let previous = from_row(&previous).ok();
        let was_scheduled = previous
            .as_ref()
            .map(|prev| prev.scheduled_date.is_some())
            .unwrap_or(false);

        self.rows
            .update_by_id(&self.sync_cfg.tasks_table, &task.id, to_row(&task))
            .await?;

        let sync = self.mirror(&task).await;
        let reconcile_job = if was_scheduled && task.scheduled_date.is_none() {
            // The stale event may sit on an override calendar named by the
            // old or the new row; make sure the sweep visits both.
            let mut extra = BTreeSet::new();
            extra.extend(previous.and_then(|prev| prev.calendar_id));
            extra.extend(task.calendar_id.clone());
            Some(self.queue_reconcile(extra).await?)
        } else {
            None
        };
        Ok(TaskWriteResult {
            task,
            sync,
            reconcile_job,
        })
    }

    /// Delete a task row and queue the sweep that removes its event. A row
    /// that is already gone still triggers the sweep, so a half-completed
    /// earlier delete converges.
    pub async fn delete_task(&self, id: &str) -> Result<JobId> {
        // Capture the row's calendar before it disappears: once the row is
        // gone, nothing else remembers which calendar its event lives on.
        let mut extra = BTreeSet::new();
        if let Some(row) = self.rows.get_by_id(&self.sync_cfg.tasks_table, id).await? {
            if let Ok(prev) = from_row(&row) {
                extra.extend(prev.calendar_id);
            }
        }
        match self.rows.delete_by_id(&self.sync_cfg.tasks_table, id).await {
            Ok(()) => {}
            Err(CallsheetError::NotFound(_)) => {
                warn!(task_id = %id, "delete of a missing row, sweeping anyway");
            }
            Err(e) => return Err(e),
        }
        self.queue_reconcile(extra).await
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        match self.rows.get_by_id(&self.sync_cfg.tasks_table, id).await? {
            Some(row) => Ok(Some(from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Calendar-wins merged view of both stores over the window.
    pub async fn list_tasks(&self, window: EventWindow) -> Result<Vec<Task>> {
        merged_view(&self.rows, self.calendar.as_ref(), &self.sync_cfg, window).await
    }

    /// Full convergence sweep: re-upsert every scheduled task, then run the
    /// orphan reconcile inline. Per-task failures are collected, not fatal.
    pub async fn sync_now(&self, window: Option<EventWindow>) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut scheduled_ids = HashSet::new();
        let mut calendars = BTreeSet::new();

        for row in self.rows.list_all(&self.sync_cfg.tasks_table).await? {
            let task = match from_row(&row) {
                Ok(task) => task,
                Err(e) => {
                    let id = row.first().cloned().unwrap_or_default();
                    warn!(task_id = %id, error = %e, "undecodable row skipped by sweep");
                    report.failures.push((id, e.to_string()));
                    continue;
                }
            };
            calendars.extend(task.calendar_id.clone());
            match upsert(self.calendar.as_ref(), &self.sync_cfg, &task).await {
                Ok(UpsertOutcome::Skipped) => report.skipped += 1,
                Ok(_) => {
                    scheduled_ids.insert(task.id.clone());
                    report.upserted += 1;
                }
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "sweep upsert failed");
                    // The event may still exist from an earlier run; keep the
                    // id authoritative so reconcile does not reap it.
                    if task.scheduled_date.is_some() {
                        scheduled_ids.insert(task.id.clone());
                    }
                    report.failures.push((task.id, e.to_string()));
                }
            }
        }

        report.reconcile = reconcile(
            self.calendar.as_ref(),
            &self.sync_cfg,
            &scheduled_ids,
            &calendars,
            window,
        )
        .await?;
        Ok(report)
    }

    /// Run the orphan sweep inline instead of through the outbox.
    pub async fn reconcile_now(&self, window: Option<EventWindow>) -> Result<ReconcileReport> {
        let (ids, calendars) = self.sweep_snapshot().await?;
        reconcile(self.calendar.as_ref(), &self.sync_cfg, &ids, &calendars, window).await
    }

    pub fn reconcile_status(&self, id: JobId) -> Option<JobStatus> {
        self.outbox.status(id)
    }

    /// Drain the outbox and stop its worker.
    pub async fn shutdown(&self) {
        self.outbox.shutdown().await;
    }

    /// Best-effort calendar mirroring of one task.
    async fn mirror(&self, task: &Task) -> SyncStatus {
        match upsert(self.calendar.as_ref(), &self.sync_cfg, task).await {
            Ok(outcome) => SyncStatus::Synced(outcome),
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "calendar mirror failed, row write kept");
                SyncStatus::Degraded(e.to_string())
            }
        }
    }

    /// Queue an orphan sweep keyed on the current set of scheduled task ids.
    /// `extra` names calendars the row set no longer mentions (a just-deleted
    /// or just-edited row) that still need sweeping.
    async fn queue_reconcile(&self, extra: BTreeSet<String>) -> Result<JobId> {
        let (ids, mut calendars) = self.sweep_snapshot().await?;
        calendars.extend(extra);
        self.outbox.enqueue(ids, calendars, None)
    }

    /// Ids of rows that still have a schedule, plus every override calendar
    /// the row set references. Rows too short to carry a `ScheduledDate` cell
    /// count as unscheduled; short rows have no `CalendarId` cell either.
    async fn sweep_snapshot(&self) -> Result<(HashSet<String>, BTreeSet<String>)> {
        const SCHEDULED_DATE_COL: usize = 8;
        const CALENDAR_ID_COL: usize = 15;

        let mut ids = HashSet::new();
        let mut calendars = BTreeSet::new();
        for row in self.rows.list_all(&self.sync_cfg.tasks_table).await? {
            if let Some(cell) = row.get(CALENDAR_ID_COL) {
                if !cell.trim().is_empty() {
                    calendars.insert(cell.trim().to_string());
                }
            }
            let scheduled = row
                .get(SCHEDULED_DATE_COL)
                .map(|cell| !cell.trim().is_empty())
                .unwrap_or(false);
            if scheduled {
                if let Some(id) = row.into_iter().next() {
                    ids.insert(id);
                }
            }
        }
        Ok((ids, calendars))
    }
}
