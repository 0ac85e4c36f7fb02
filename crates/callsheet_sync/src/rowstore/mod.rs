//! Row store port and id-addressed CRUD client.
//!
//! A spreadsheet has no primary-key index, so every by-id operation is a
//! linear scan of the first column. That is fine at hundreds of rows but
//! find-then-mutate is NOT atomic: two writers racing on the same id can
//! interleave (one finds index N, a concurrent delete shifts rows, the update
//! lands on the wrong row). Callers needing strict correctness under
//! concurrent edits must serialize writes per task id in front of this client.

pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use callsheet_core::{CallsheetError, Result};

pub use memory::InMemorySheet;
pub use rest::RestSheet;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("row index {0} out of range")]
    BadIndex(usize),
}

impl From<SheetError> for CallsheetError {
    fn from(e: SheetError) -> Self {
        CallsheetError::external("rowstore", e.to_string())
    }
}

/// Low-level transport to the spreadsheet service. Row indices are 0-based
/// absolute positions including the header row; implementations must keep
/// exactly that addressing so `delete_row` shifts subsequent rows up.
#[async_trait]
pub trait SheetTransport: Send + Sync {
    async fn table_titles(&self) -> std::result::Result<Vec<String>, SheetError>;

    /// Create a table and write its header row in one step.
    async fn add_table(
        &self,
        title: &str,
        header: Vec<String>,
    ) -> std::result::Result<(), SheetError>;

    /// All rows including the header.
    async fn read_all(&self, table: &str) -> std::result::Result<Vec<Vec<String>>, SheetError>;

    async fn append_row(
        &self,
        table: &str,
        row: Vec<String>,
    ) -> std::result::Result<(), SheetError>;

    async fn update_row(
        &self,
        table: &str,
        index: usize,
        row: Vec<String>,
    ) -> std::result::Result<(), SheetError>;

    async fn delete_row(&self, table: &str, index: usize) -> std::result::Result<(), SheetError>;

    /// Overwrite the header row without touching data rows.
    async fn update_header(
        &self,
        table: &str,
        header: Vec<String>,
    ) -> std::result::Result<(), SheetError>;
}

/// Id-addressed CRUD over a named table. The id always lives in the first
/// column; data starts at row 2 of the sheet (absolute index 1).
pub struct RowStore<T> {
    transport: Arc<T>,
}

impl<T> Clone for RowStore<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: SheetTransport> RowStore<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// All non-empty data rows below the header.
    pub async fn list_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let rows = self.transport.read_all(table).await?;
        Ok(rows
            .into_iter()
            .skip(1)
            .filter(|r| r.first().map(|c| !c.trim().is_empty()).unwrap_or(false))
            .collect())
    }

    /// Append one row. No uniqueness enforcement at this layer; callers must
    /// check existence first or treat an id collision as an update.
    pub async fn append(&self, table: &str, row: Vec<String>) -> Result<()> {
        self.transport.append_row(table, row).await?;
        Ok(())
    }

    /// 1-based data position of the row whose first column exactly matches
    /// `id`, or `None`. Case-sensitive.
    pub async fn find_row_index(&self, table: &str, id: &str) -> Result<Option<usize>> {
        let rows = self.transport.read_all(table).await?;
        for (i, row) in rows.iter().enumerate().skip(1) {
            if row.first().map(String::as_str) == Some(id) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Overwrite the full row at a 1-based data position.
    pub async fn update_by_index(&self, table: &str, index: usize, row: Vec<String>) -> Result<()> {
        self.transport.update_row(table, index, row).await?;
        Ok(())
    }

    /// Remove exactly one row at a 1-based data position; subsequent rows
    /// shift up.
    pub async fn delete_by_index(&self, table: &str, index: usize) -> Result<()> {
        self.transport.delete_row(table, index).await?;
        Ok(())
    }

    pub async fn get_by_id(&self, table: &str, id: &str) -> Result<Option<Vec<String>>> {
        let rows = self.transport.read_all(table).await?;
        Ok(rows
            .into_iter()
            .skip(1)
            .find(|row| row.first().map(String::as_str) == Some(id)))
    }

    pub async fn update_by_id(&self, table: &str, id: &str, row: Vec<String>) -> Result<()> {
        match self.find_row_index(table, id).await? {
            Some(index) => self.update_by_index(table, index, row).await,
            None => Err(CallsheetError::NotFound(id.to_string())),
        }
    }

    pub async fn delete_by_id(&self, table: &str, id: &str) -> Result<()> {
        match self.find_row_index(table, id).await? {
            Some(index) => self.delete_by_index(table, index).await,
            None => Err(CallsheetError::NotFound(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, title: &str) -> Vec<String> {
        vec![id.to_string(), title.to_string()]
    }

    async fn seeded_store() -> RowStore<InMemorySheet> {
        let sheet = Arc::new(InMemorySheet::new());
        sheet
            .add_table("Tasks", vec!["ID".into(), "Title".into()])
            .await
            .unwrap();
        let store = RowStore::new(sheet);
        store.append("Tasks", row("T1", "Kickoff")).await.unwrap();
        store.append("Tasks", row("T2", "Scout")).await.unwrap();
        store.append("Tasks", row("T3", "Wrap")).await.unwrap();
        store
    }

    #[tokio::test]
    async fn list_all_skips_header_and_blank_rows() {
        let store = seeded_store().await;
        store.append("Tasks", vec!["".into(), "ghost".into()]).await.unwrap();
        let rows = store.list_all("Tasks").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "T1");
    }

    #[tokio::test]
    async fn find_row_index_is_one_based_and_case_sensitive() {
        let store = seeded_store().await;
        assert_eq!(store.find_row_index("Tasks", "T2").await.unwrap(), Some(2));
        assert_eq!(store.find_row_index("Tasks", "t2").await.unwrap(), None);
        assert_eq!(store.find_row_index("Tasks", "T9").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_by_id_replaces_the_row() {
        let store = seeded_store().await;
        store
            .update_by_id("Tasks", "T2", row("T2", "Location scout"))
            .await
            .unwrap();
        let got = store.get_by_id("Tasks", "T2").await.unwrap().unwrap();
        assert_eq!(got[1], "Location scout");
    }

    #[tokio::test]
    async fn delete_by_id_shifts_subsequent_rows_up() {
        let store = seeded_store().await;
        store.delete_by_id("Tasks", "T2").await.unwrap();
        assert_eq!(store.find_row_index("Tasks", "T3").await.unwrap(), Some(2));
        assert_eq!(store.list_all("Tasks").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let store = seeded_store().await;
        let err = store.delete_by_id("Tasks", "T9").await.unwrap_err();
        assert!(matches!(err, CallsheetError::NotFound(ref id) if id == "T9"));
        let err = store
            .update_by_id("Tasks", "T9", row("T9", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallsheetError::NotFound(_)));
    }
}
