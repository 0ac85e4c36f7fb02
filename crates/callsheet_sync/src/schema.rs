//! Idempotent schema provisioning for the row store.

use std::sync::Arc;

use tracing::info;

use callsheet_core::{header_row, Result};

use crate::rowstore::SheetTransport;

#[derive(Debug, Clone)]
pub struct TableSpec {
    pub title: String,
    pub header: Vec<String>,
}

impl TableSpec {
    pub fn new(title: impl Into<String>, header: &[&str]) -> Self {
        Self {
            title: title.into(),
            header: header.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Ensures required tables and columns exist. Safe to call on every request:
/// it only creates what is missing and never rewrites data rows.
pub struct SchemaManager<T> {
    transport: Arc<T>,
    tables: Vec<TableSpec>,
    /// Table whose header is checked for newly-added trailing columns.
    healed_table: String,
}

impl<T: SheetTransport> SchemaManager<T> {
    pub fn new(transport: Arc<T>, tables: Vec<TableSpec>, healed_table: impl Into<String>) -> Self {
        Self {
            transport,
            tables,
            healed_table: healed_table.into(),
        }
    }

    /// Default production-tracker layout: task sync plus the roster and
    /// expense sheets the rest of the tool reads.
    pub fn with_defaults(transport: Arc<T>, tasks_table: &str) -> Self {
        let tables = vec![
            TableSpec {
                title: tasks_table.to_string(),
                header: header_row(),
            },
            TableSpec::new(
                "Team",
                &["ID", "Name", "Email", "Role", "Department", "Phone", "Notes"],
            ),
            TableSpec::new(
                "Expenses",
                &["ID", "Date", "Category", "Description", "Amount", "PaidBy", "Status", "Receipt"],
            ),
        ];
        Self::new(transport, tables, tasks_table)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        let existing = self.transport.table_titles().await?;
        for spec in &self.tables {
            if !existing.iter().any(|t| t == &spec.title) {
                info!(table = %spec.title, "creating missing table");
                self.transport
                    .add_table(&spec.title, spec.header.clone())
                    .await?;
            }
        }
        self.heal_trailing_columns().await
    }

    /// Backfill trailing header columns added after a sheet was provisioned
    /// (e.g. `CalendarId` on the task table), without disturbing data rows.
    async fn heal_trailing_columns(&self) -> Result<()> {
        let Some(spec) = self.tables.iter().find(|s| s.title == self.healed_table) else {
            return Ok(());
        };
        let rows = self.transport.read_all(&spec.title).await?;
        let Some(current) = rows.first() else {
            self.transport
                .update_header(&spec.title, spec.header.clone())
                .await?;
            return Ok(());
        };
        if current.len() < spec.header.len() && spec.header.starts_with(current) {
            info!(
                table = %spec.title,
                added = spec.header.len() - current.len(),
                "backfilling trailing header columns"
            );
            self.transport
                .update_header(&spec.title, spec.header.clone())
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rowstore::{InMemorySheet, SheetTransport};
    use callsheet_core::TASK_COLUMNS;

    #[tokio::test]
    async fn ensure_schema_creates_missing_tables_with_headers() {
        let sheet = Arc::new(InMemorySheet::new());
        let schema = SchemaManager::with_defaults(Arc::clone(&sheet), "Tasks");
        schema.ensure_schema().await.unwrap();

        let mut titles = sheet.table_titles().await.unwrap();
        titles.sort();
        assert_eq!(titles, vec!["Expenses", "Tasks", "Team"]);
        let tasks = sheet.snapshot("Tasks").await.unwrap();
        assert_eq!(tasks[0], header_row());
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let sheet = Arc::new(InMemorySheet::new());
        let schema = SchemaManager::with_defaults(Arc::clone(&sheet), "Tasks");
        schema.ensure_schema().await.unwrap();
        sheet
            .append_row("Tasks", vec!["T1".into(), "Kickoff".into()])
            .await
            .unwrap();

        schema.ensure_schema().await.unwrap();
        let tasks = sheet.snapshot("Tasks").await.unwrap();
        assert_eq!(tasks.len(), 2, "data row must survive a re-run");
    }

    #[tokio::test]
    async fn trailing_column_is_backfilled_without_touching_data() {
        let sheet = Arc::new(InMemorySheet::new());
        // Simulate a sheet provisioned before CalendarId existed.
        let old_header: Vec<String> = TASK_COLUMNS[..15].iter().map(|c| c.to_string()).collect();
        sheet.add_table("Tasks", old_header).await.unwrap();
        sheet
            .append_row("Tasks", vec!["T1".into(), "Kickoff".into()])
            .await
            .unwrap();

        let schema = SchemaManager::with_defaults(Arc::clone(&sheet), "Tasks");
        schema.ensure_schema().await.unwrap();

        let tasks = sheet.snapshot("Tasks").await.unwrap();
        assert_eq!(tasks[0], header_row());
        assert_eq!(tasks[1][0], "T1");
    }

    #[tokio::test]
    async fn diverged_header_is_left_alone() {
        let sheet = Arc::new(InMemorySheet::new());
        let custom = vec!["ID".to_string(), "Something Else".to_string()];
        sheet.add_table("Tasks", custom.clone()).await.unwrap();

        let schema = SchemaManager::with_defaults(Arc::clone(&sheet), "Tasks");
        schema.ensure_schema().await.unwrap();

        let tasks = sheet.snapshot("Tasks").await.unwrap();
        assert_eq!(tasks[0], custom, "non-prefix headers are not rewritten");
    }
}
