//! Service configuration.

use callsheet_sync::SyncConfig;

use crate::outbox::RetryPolicy;

/// Configuration for one `TaskService` instance.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Primary calendar id; tasks may override it per row.
    pub calendar_id: String,
    /// IANA timezone attached to timed events.
    pub time_zone: String,
    /// Ownership tag written into every mirrored event.
    pub source_tag: String,
    /// Worksheet holding task rows.
    pub tasks_table: String,
    /// Retry schedule for queued reconcile jobs.
    pub retry: RetryPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            time_zone: "UTC".to_string(),
            source_tag: "callsheet".to_string(),
            tasks_table: "Tasks".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ServiceConfig {
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_source_tag(mut self, source_tag: impl Into<String>) -> Self {
        self.source_tag = source_tag.into();
        self
    }

    pub fn with_tasks_table(mut self, table: impl Into<String>) -> Self {
        self.tasks_table = table.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The engine-level view of this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            calendar_id: self.calendar_id.clone(),
            time_zone: self.time_zone.clone(),
            source_tag: self.source_tag.clone(),
            tasks_table: self.tasks_table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = ServiceConfig::default()
            .with_calendar_id("unit-b")
            .with_time_zone("Europe/Madrid")
            .with_source_tag("callsheet-staging")
            .with_tasks_table("Tasks2026")
            .with_retry(RetryPolicy::new(Duration::from_millis(10), 2, 5));

        assert_eq!(cfg.calendar_id, "unit-b");
        assert_eq!(cfg.retry.max_attempts, 5);

        let sync = cfg.sync_config();
        assert_eq!(sync.calendar_id, "unit-b");
        assert_eq!(sync.time_zone, "Europe/Madrid");
        assert_eq!(sync.source_tag, "callsheet-staging");
        assert_eq!(sync.tasks_table, "Tasks2026");
    }
}
