//! Command dispatch and service construction.

pub mod schema;
pub mod sync;
pub mod task;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Months, Utc};

use callsheet_runtime::{ServiceConfig, TaskService};
use callsheet_sync::calendar::RestCalendar;
use callsheet_sync::rowstore::RestSheet;
use callsheet_sync::EventWindow;

use crate::cli::{Cli, Command, WindowArgs};

pub async fn handle(cli: Cli) -> Result<()> {
    let service = build_service()?;
    let result = match cli.command {
        Command::Schema { action } => schema::handle(&service, action).await,
        Command::Task { action } => task::handle(&service, action).await,
        Command::Sync { window } => sync::sync(&service, window).await,
        Command::Reconcile { window } => sync::reconcile(&service, window).await,
    };
    // Drain queued reconcile work before the process exits.
    service.shutdown().await;
    result
}

fn env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing environment variable {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Build the task service from `CALLSHEET_*` environment variables.
fn build_service() -> Result<TaskService<RestSheet>> {
    let sheet = RestSheet::new(
        env("CALLSHEET_SHEET_BASE").context("spreadsheet endpoint")?,
        env("CALLSHEET_SHEET_TOKEN").context("spreadsheet credentials")?,
        env("CALLSHEET_SPREADSHEET_ID").context("spreadsheet id")?,
    );
    let calendar = RestCalendar::new(
        env("CALLSHEET_CALENDAR_BASE").context("calendar endpoint")?,
        env("CALLSHEET_CALENDAR_TOKEN").context("calendar credentials")?,
    );
    let cfg = ServiceConfig::default()
        .with_calendar_id(env_or("CALLSHEET_CALENDAR_ID", "primary"))
        .with_time_zone(env_or("CALLSHEET_TZ", "UTC"))
        .with_source_tag(env_or("CALLSHEET_SOURCE_TAG", "callsheet"))
        .with_tasks_table(env_or("CALLSHEET_TASKS_TABLE", "Tasks"));
    Ok(TaskService::new(Arc::new(sheet), Arc::new(calendar), cfg))
}

/// Resolve a window from flags, defaulting to last month through next year.
pub fn resolve_window(args: WindowArgs) -> EventWindow {
    let today = Utc::now().date_naive();
    let start = args
        .from
        .unwrap_or_else(|| (today - Months::new(1)).with_day(1).unwrap_or(today));
    let end = args.to.unwrap_or_else(|| today + Months::new(12));
    EventWindow::new(start, end)
}
