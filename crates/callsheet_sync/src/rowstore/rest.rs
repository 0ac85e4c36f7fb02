//! REST sheet transport against a Sheets-style values API.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use super::{SheetError, SheetTransport};

pub struct RestSheet {
    base_url: String,
    token: String,
    spreadsheet_id: String,
    client: reqwest::Client,
}

impl RestSheet {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        spreadsheet_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            spreadsheet_id: spreadsheet_id.into(),
            client: reqwest::Client::new(),
        }
    }

    fn spreadsheet_url(&self, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}{}",
            self.base_url.trim_end_matches('/'),
            self.spreadsheet_id,
            suffix
        )
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<JsonValue, SheetError> {
        let response = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(SheetError::Request(format!("{status}: {text}")));
        }
        if text.is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&text).map_err(|e| SheetError::Request(e.to_string()))
    }

    async fn batch_update(&self, request: JsonValue) -> Result<JsonValue, SheetError> {
        let url = self.spreadsheet_url(":batchUpdate");
        self.send(self.client.post(&url).json(&json!({ "requests": [request] })))
            .await
    }

    /// Numeric sheet id for a table title, needed by row-dimension updates.
    async fn sheet_id(&self, table: &str) -> Result<i64, SheetError> {
        let url = self.spreadsheet_url("?fields=sheets.properties");
        let body = self.send(self.client.get(&url)).await?;
        let sheets = body["sheets"].as_array().cloned().unwrap_or_default();
        for sheet in &sheets {
            let props = &sheet["properties"];
            if props["title"].as_str() == Some(table) {
                if let Some(id) = props["sheetId"].as_i64() {
                    return Ok(id);
                }
            }
        }
        Err(SheetError::NoSuchTable(table.to_string()))
    }

    fn parse_values(body: &JsonValue) -> Vec<Vec<String>> {
        body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|c| c.as_str().unwrap_or_default().to_string())
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SheetTransport for RestSheet {
    async fn table_titles(&self) -> Result<Vec<String>, SheetError> {
        let url = self.spreadsheet_url("?fields=sheets.properties.title");
        let body = self.send(self.client.get(&url)).await?;
        Ok(body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_table(&self, title: &str, header: Vec<String>) -> Result<(), SheetError> {
        self.batch_update(json!({ "addSheet": { "properties": { "title": title } } }))
            .await?;
        self.update_header(title, header).await
    }

    async fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.spreadsheet_url(&format!("/values/{table}"));
        let body = self.send(self.client.get(&url)).await?;
        Ok(Self::parse_values(&body))
    }

    async fn append_row(&self, table: &str, row: Vec<String>) -> Result<(), SheetError> {
        let url = self.spreadsheet_url(&format!("/values/{table}:append?valueInputOption=RAW"));
        self.send(self.client.post(&url).json(&json!({ "values": [row] })))
            .await?;
        Ok(())
    }

    async fn update_row(&self, table: &str, index: usize, row: Vec<String>) -> Result<(), SheetError> {
        let url = self.spreadsheet_url(&format!(
            "/values/{table}!A{}?valueInputOption=RAW",
            index + 1
        ));
        self.send(self.client.put(&url).json(&json!({ "values": [row] })))
            .await?;
        Ok(())
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<(), SheetError> {
        if index == 0 {
            return Err(SheetError::BadIndex(index));
        }
        let sheet_id = self.sheet_id(table).await?;
        self.batch_update(json!({
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": index,
                    "endIndex": index + 1,
                }
            }
        }))
        .await?;
        Ok(())
    }

    async fn update_header(&self, table: &str, header: Vec<String>) -> Result<(), SheetError> {
        self.update_row(table, 0, header).await
    }
}
