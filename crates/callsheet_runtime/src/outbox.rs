//! Reconcile outbox: queued cleanup work with retry.
//!
//! Row-store deletes commit before the calendar hears about them, so the
//! cleanup sweep must survive transient calendar failures. Each delete (or
//! schedule removal) enqueues a job here; a worker drains the queue and runs
//! the orphan sweep, backing off between attempts. Job status is observable
//! by id; terminal statuses are kept for a bounded number of recent jobs.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use callsheet_core::{CallsheetError, Result};
use callsheet_sync::{reconcile, CalendarApi, EventWindow, SyncConfig};

pub type JobId = Uuid;

/// Terminal job statuses retained for late polls. Older finished jobs are
/// evicted so a long-lived service does not accumulate one entry per write.
const MAX_FINISHED_JOBS: usize = 1024;

/// Exponential backoff schedule for a job's reconcile attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            max_attempts: 4,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, multiplier: u32, max_attempts: u32) -> Self {
        Self {
            base_delay,
            multiplier,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Delay before the attempt after `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * self.multiplier.saturating_pow(attempt.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running { attempt: u32 },
    Retrying { attempts: u32 },
    Succeeded { deleted: usize },
    Failed { message: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded { .. } | JobStatus::Failed { .. })
    }
}

struct Job {
    id: JobId,
    authoritative_ids: HashSet<String>,
    calendars: BTreeSet<String>,
    window: Option<EventWindow>,
}

/// Status map with bounded retention of finished jobs. In-flight entries are
/// never evicted; terminal ones rotate out once `MAX_FINISHED_JOBS` newer
/// jobs have finished after them.
#[derive(Default)]
struct StatusBook {
    map: HashMap<JobId, JobStatus>,
    finished: VecDeque<JobId>,
}

impl StatusBook {
    fn set(&mut self, id: JobId, status: JobStatus) {
        let terminal = status.is_terminal();
        self.map.insert(id, status);
        if terminal {
            self.finished.push_back(id);
            while self.finished.len() > MAX_FINISHED_JOBS {
                if let Some(old) = self.finished.pop_front() {
                    self.map.remove(&old);
                }
            }
        }
    }

    fn get(&self, id: JobId) -> Option<JobStatus> {
        self.map.get(&id).cloned()
    }
}

/// Serialized reconcile worker over one calendar service.
pub struct ReconcileQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    statuses: Arc<Mutex<StatusBook>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReconcileQueue {
    pub fn spawn(api: Arc<dyn CalendarApi>, cfg: SyncConfig, policy: RetryPolicy) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let statuses: Arc<Mutex<StatusBook>> = Arc::default();

        let worker_statuses = Arc::clone(&statuses);
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                run_job(api.as_ref(), &cfg, policy, &worker_statuses, job).await;
            }
        });

        Self {
            tx: Mutex::new(Some(tx)),
            statuses,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a sweep that deletes every owned event whose task id is not in
    /// `authoritative_ids`. `calendars` names the override calendars to sweep
    /// besides the primary. Returns immediately; poll `status` for progress.
    pub fn enqueue(
        &self,
        authoritative_ids: HashSet<String>,
        calendars: BTreeSet<String>,
        window: Option<EventWindow>,
    ) -> Result<JobId> {
        let id = Uuid::new_v4();
        let guard = self.tx.lock().unwrap();
        let tx = guard
            .as_ref()
            .ok_or_else(|| CallsheetError::external("outbox", "queue is shut down"))?;
        self.statuses.lock().unwrap().set(id, JobStatus::Queued);
        tx.send(Job {
            id,
            authoritative_ids,
            calendars,
            window,
        })
        .map_err(|_| CallsheetError::external("outbox", "worker is gone"))?;
        Ok(id)
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.statuses.lock().unwrap().get(id)
    }

    /// Stop accepting jobs and wait for the worker to drain what is queued.
    pub async fn shutdown(&self) {
        self.tx.lock().unwrap().take();
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "reconcile worker did not shut down cleanly");
            }
        }
    }
}

async fn run_job(
    api: &dyn CalendarApi,
    cfg: &SyncConfig,
    policy: RetryPolicy,
    statuses: &Mutex<StatusBook>,
    job: Job,
) {
    let set_status = |status: JobStatus| {
        statuses.lock().unwrap().set(job.id, status);
    };

    let mut last_error = String::new();
    for attempt in 1..=policy.max_attempts {
        set_status(JobStatus::Running { attempt });
        match reconcile(api, cfg, &job.authoritative_ids, &job.calendars, job.window).await {
            Ok(report) if report.is_clean() => {
                info!(job_id = %job.id, deleted = report.deleted, "reconcile job finished");
                set_status(JobStatus::Succeeded {
                    deleted: report.deleted,
                });
                return;
            }
            Ok(report) => {
                last_error = format!("{} orphan deletes failed", report.failures.len());
            }
            Err(e) => last_error = e.to_string(),
        }
        if attempt < policy.max_attempts {
            warn!(job_id = %job.id, attempt, error = %last_error, "reconcile attempt failed, backing off");
            set_status(JobStatus::Retrying { attempts: attempt });
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }
    warn!(job_id = %job.id, error = %last_error, "reconcile job exhausted its retries");
    set_status(JobStatus::Failed {
        message: last_error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsheet_sync::calendar::{
        CalendarError, CalendarEvent, EventTime, InMemoryCalendar, PROP_SOURCE, PROP_TASK_ID,
    };
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), 2, 3)
    }

    async fn wait_terminal(queue: &ReconcileQueue, id: JobId) -> JobStatus {
        for _ in 0..500 {
            if let Some(status) = queue.status(id) {
                if status.is_terminal() {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job {id} never reached a terminal status");
    }

    fn tagged_event(id: &str, task_id: &str) -> CalendarEvent {
        let d = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let mut event = CalendarEvent {
            id: id.to_string(),
            summary: format!("task {task_id}"),
            start: EventTime::all_day(d),
            end: EventTime::all_day(d.succ_opt().unwrap()),
            ..Default::default()
        };
        event
            .private_props
            .insert(PROP_SOURCE.into(), "callsheet".into());
        event
            .private_props
            .insert(PROP_TASK_ID.into(), task_id.into());
        event
    }

    /// Fails the first `failures` list calls, then delegates.
    struct FlakyCalendar {
        inner: InMemoryCalendar,
        remaining_failures: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CalendarApi for FlakyCalendar {
        async fn get_event(
            &self,
            calendar_id: &str,
            event_id: &str,
        ) -> std::result::Result<Option<CalendarEvent>, CalendarError> {
            self.inner.get_event(calendar_id, event_id).await
        }

        async fn insert_event(
            &self,
            calendar_id: &str,
            event: CalendarEvent,
        ) -> std::result::Result<CalendarEvent, CalendarError> {
            self.inner.insert_event(calendar_id, event).await
        }

        async fn patch_event(
            &self,
            calendar_id: &str,
            event: CalendarEvent,
        ) -> std::result::Result<CalendarEvent, CalendarError> {
            self.inner.patch_event(calendar_id, event).await
        }

        async fn delete_event(
            &self,
            calendar_id: &str,
            event_id: &str,
        ) -> std::result::Result<(), CalendarError> {
            self.inner.delete_event(calendar_id, event_id).await
        }

        async fn list_events(
            &self,
            calendar_id: &str,
            window: Option<EventWindow>,
            private_props: &BTreeMap<String, String>,
        ) -> std::result::Result<Vec<CalendarEvent>, CalendarError> {
            if self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(CalendarError::Service("quota exceeded".into()));
            }
            self.inner.list_events(calendar_id, window, private_props).await
        }
    }

    #[test]
    fn backoff_grows_geometrically() {
        let policy = RetryPolicy::new(Duration::from_millis(100), 2, 4);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn finished_statuses_are_evicted_beyond_the_cap() {
        let mut book = StatusBook::default();
        let first = Uuid::new_v4();
        book.set(first, JobStatus::Succeeded { deleted: 0 });
        for _ in 0..MAX_FINISHED_JOBS {
            book.set(Uuid::new_v4(), JobStatus::Succeeded { deleted: 0 });
        }

        // The oldest finished entry rotated out; the map stays at the cap.
        assert_eq!(book.get(first), None);
        assert_eq!(book.map.len(), MAX_FINISHED_JOBS);
    }

    #[test]
    fn in_flight_statuses_survive_eviction() {
        let mut book = StatusBook::default();
        let running = Uuid::new_v4();
        book.set(running, JobStatus::Running { attempt: 1 });
        for _ in 0..(MAX_FINISHED_JOBS * 2) {
            book.set(Uuid::new_v4(), JobStatus::Failed { message: "x".into() });
        }

        assert_eq!(book.get(running), Some(JobStatus::Running { attempt: 1 }));
    }

    #[tokio::test]
    async fn queued_job_sweeps_orphans() {
        let cal = Arc::new(InMemoryCalendar::new());
        cal.seed("primary", tagged_event("e1", "T1")).await;
        cal.seed("primary", tagged_event("e2", "T2")).await;

        let queue = ReconcileQueue::spawn(cal.clone(), SyncConfig::default(), fast_policy());
        let live: HashSet<String> = ["T1".to_string()].into_iter().collect();
        let id = queue.enqueue(live, BTreeSet::new(), None).unwrap();

        assert_eq!(wait_terminal(&queue, id).await, JobStatus::Succeeded { deleted: 1 });
        assert_eq!(cal.event_count("primary").await, 1);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn queued_job_sweeps_override_calendars_too() {
        let cal = Arc::new(InMemoryCalendar::new());
        cal.seed("unit-b", tagged_event("e1", "T-gone")).await;

        let queue = ReconcileQueue::spawn(cal.clone(), SyncConfig::default(), fast_policy());
        let calendars: BTreeSet<String> = ["unit-b".to_string()].into_iter().collect();
        let id = queue.enqueue(HashSet::new(), calendars, None).unwrap();

        assert_eq!(wait_terminal(&queue, id).await, JobStatus::Succeeded { deleted: 1 });
        assert_eq!(cal.event_count("unit-b").await, 0);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_success() {
        let cal = Arc::new(FlakyCalendar {
            inner: InMemoryCalendar::new(),
            remaining_failures: AtomicUsize::new(2),
        });
        cal.inner.seed("primary", tagged_event("e1", "T-gone")).await;

        let queue = ReconcileQueue::spawn(cal.clone(), SyncConfig::default(), fast_policy());
        let id = queue.enqueue(HashSet::new(), BTreeSet::new(), None).unwrap();

        assert_eq!(wait_terminal(&queue, id).await, JobStatus::Succeeded { deleted: 1 });
        assert_eq!(cal.inner.event_count("primary").await, 0);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn exhausted_retries_mark_the_job_failed() {
        let cal = Arc::new(FlakyCalendar {
            inner: InMemoryCalendar::new(),
            remaining_failures: AtomicUsize::new(usize::MAX),
        });
        let queue = ReconcileQueue::spawn(cal, SyncConfig::default(), fast_policy());
        let id = queue.enqueue(HashSet::new(), BTreeSet::new(), None).unwrap();

        let status = wait_terminal(&queue, id).await;
        assert!(matches!(status, JobStatus::Failed { ref message } if message.contains("quota")));
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_an_error() {
        let cal = Arc::new(InMemoryCalendar::new());
        let queue = ReconcileQueue::spawn(cal, SyncConfig::default(), fast_policy());
        queue.shutdown().await;
        assert!(queue.enqueue(HashSet::new(), BTreeSet::new(), None).is_err());
    }
}
