//! In-memory sheet transport for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SheetError, SheetTransport};

#[derive(Default)]
pub struct InMemorySheet {
    tables: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl InMemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw snapshot of a table, header included. For assertions and debugging.
    pub async fn snapshot(&self, table: &str) -> Option<Vec<Vec<String>>> {
        self.tables.read().await.get(table).cloned()
    }
}

#[async_trait]
impl SheetTransport for InMemorySheet {
    async fn table_titles(&self) -> Result<Vec<String>, SheetError> {
        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn add_table(&self, title: &str, header: Vec<String>) -> Result<(), SheetError> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(title) {
            return Err(SheetError::Request(format!("table `{title}` already exists")));
        }
        tables.insert(title.to_string(), vec![header]);
        Ok(())
    }

    async fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>, SheetError> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| SheetError::NoSuchTable(table.to_string()))
    }

    async fn append_row(&self, table: &str, row: Vec<String>) -> Result<(), SheetError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| SheetError::NoSuchTable(table.to_string()))?;
        rows.push(row);
        Ok(())
    }

    async fn update_row(&self, table: &str, index: usize, row: Vec<String>) -> Result<(), SheetError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| SheetError::NoSuchTable(table.to_string()))?;
        let slot = rows.get_mut(index).ok_or(SheetError::BadIndex(index))?;
        *slot = row;
        Ok(())
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<(), SheetError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| SheetError::NoSuchTable(table.to_string()))?;
        // Never delete the header row through this path.
        if index == 0 || index >= rows.len() {
            return Err(SheetError::BadIndex(index));
        }
        rows.remove(index);
        Ok(())
    }

    async fn update_header(&self, table: &str, header: Vec<String>) -> Result<(), SheetError> {
        self.update_row(table, 0, header).await
    }
}
