//! `callsheet schema` subcommands.

use anyhow::Result;

use callsheet_runtime::TaskService;
use callsheet_sync::rowstore::RestSheet;

use crate::cli::SchemaAction;
use crate::output;

pub async fn handle(service: &TaskService<RestSheet>, action: SchemaAction) -> Result<()> {
    match action {
        SchemaAction::Ensure => {
            service.ensure_schema().await?;
            output::success("schema is in place");
            Ok(())
        }
    }
}
