//! Task synchronization engine.
//!
//! - `rowstore`: the spreadsheet-as-database port and id-addressed CRUD client.
//! - `schema`: idempotent table/column provisioning.
//! - `calendar`: the calendar-service port, event body types, description codec.
//! - `upsert`: idempotent task → event mirroring with collision detection.
//! - `reconcile`: orphan-event sweep scoped to engine-owned events.
//! - `merge`: calendar-wins read-path merge of both stores.

pub mod calendar;
pub mod merge;
pub mod reconcile;
pub mod rowstore;
pub mod schema;
pub mod upsert;


pub use calendar::{CalendarApi, CalendarError, CalendarEvent, EventTime, EventWindow};
pub use merge::merged_view;
pub use reconcile::{reconcile, ReconcileFailure, ReconcileReport};
pub use rowstore::{RowStore, SheetError, SheetTransport};
pub use schema::{SchemaManager, TableSpec};
pub use upsert::{build_event, upsert, UpsertOutcome};

/// Engine-level configuration shared by the upsert, reconcile, and merge
/// paths. The orchestrator crate builds one of these from its service config.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Primary calendar events are mirrored onto unless a task names another.
    pub calendar_id: String,
    /// IANA timezone attached to timed events.
    pub time_zone: String,
    /// Ownership tag value; only events carrying it are ever mutated.
    pub source_tag: String,
    /// Worksheet holding task rows.
    pub tasks_table: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            time_zone: "UTC".to_string(),
            source_tag: "callsheet".to_string(),
            tasks_table: "Tasks".to_string(),
        }
    }
}

impl SyncConfig {
    /// Calendar a given task's event lives on.
    pub fn calendar_for(&self, task: &callsheet_core::Task) -> String {
        task.calendar_id
            .clone()
            .unwrap_or_else(|| self.calendar_id.clone())
    }
}
