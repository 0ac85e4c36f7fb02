//! Orchestration layer: the task service that front-ends drive.
//!
//! Writes go to the row store first and are mirrored to the calendar on a
//! best-effort basis; cleanup work that must not be lost to a transient
//! calendar failure goes through the reconcile outbox.

pub mod config;
pub mod outbox;
pub mod service;

pub use config::ServiceConfig;
pub use outbox::{JobId, JobStatus, ReconcileQueue, RetryPolicy};
pub use service::{SyncReport, SyncStatus, TaskService, TaskWriteResult};
