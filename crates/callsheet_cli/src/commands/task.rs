//! `callsheet task` subcommands.

use anyhow::{anyhow, Result};

use callsheet_core::{Task, TaskStatus};
use callsheet_runtime::{SyncStatus, TaskService, TaskWriteResult};
use callsheet_sync::rowstore::RestSheet;

use crate::cli::{TaskAction, TaskFields};
use crate::commands::resolve_window;
use crate::output;

pub async fn handle(service: &TaskService<RestSheet>, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::List { window } => list(service, window).await,
        TaskAction::Show { id } => show(service, &id).await,
        TaskAction::Create { title, fields, id } => create(service, title, fields, id).await,
        TaskAction::Update {
            id,
            title,
            fields,
            unschedule,
        } => update(service, &id, title, fields, unschedule).await,
        TaskAction::Delete { id } => delete(service, &id).await,
    }
}

async fn list(service: &TaskService<RestSheet>, window: crate::cli::WindowArgs) -> Result<()> {
    let tasks = service.list_tasks(resolve_window(window)).await?;
    if tasks.is_empty() {
        output::dim("no tasks in the window");
        return Ok(());
    }

    let mut table = output::table(&["ID", "Title", "Status", "Area", "Scheduled", "Responsible"]);
    let mut rows = Vec::with_capacity(tasks.len());
    for task in &tasks {
        let scheduled = match (&task.scheduled_date, &task.scheduled_time) {
            (Some(d), Some(t)) => format!("{d} {t}"),
            (Some(d), None) => d.clone(),
            _ => String::new(),
        };
        table.add_row(vec![
            task.id.clone(),
            task.title.clone(),
            task.status.to_string(),
            task.area.clone(),
            scheduled.clone(),
            task.responsible.join(", "),
        ]);
        rows.push(serde_json::to_value(task)?);
    }
    output::table_print(&table, rows);
    Ok(())
}

async fn show(service: &TaskService<RestSheet>, id: &str) -> Result<()> {
    let task = service
        .get_task(id)
        .await?
        .ok_or_else(|| anyhow!("no task with id {id}"))?;
    output::data("task", &task);
    Ok(())
}

async fn create(
    service: &TaskService<RestSheet>,
    title: String,
    fields: TaskFields,
    id: Option<String>,
) -> Result<()> {
    let mut task = Task::new(id.unwrap_or_default(), title);
    apply_fields(&mut task, fields);
    let result = service.create_task(task).await?;
    report_write("created", &result);
    Ok(())
}

async fn update(
    service: &TaskService<RestSheet>,
    id: &str,
    title: Option<String>,
    fields: TaskFields,
    unschedule: bool,
) -> Result<()> {
    let mut task = service
        .get_task(id)
        .await?
        .ok_or_else(|| anyhow!("no task with id {id}"))?;
    if let Some(title) = title {
        task.title = title;
    }
    apply_fields(&mut task, fields);
    if unschedule {
        task.scheduled_date = None;
        task.scheduled_time = None;
    }
    let result = service.update_task(task).await?;
    report_write("updated", &result);
    if result.reconcile_job.is_some() {
        output::dim("schedule removed; the mirrored event will be reaped");
    }
    Ok(())
}

async fn delete(service: &TaskService<RestSheet>, id: &str) -> Result<()> {
    service.delete_task(id).await?;
    output::success(&format!("deleted task {id}"));
    Ok(())
}

fn apply_fields(task: &mut Task, fields: TaskFields) {
    if let Some(date) = fields.date {
        task.scheduled_date = Some(date);
        task.scheduled_time = fields.time;
    }
    if let Some(status) = fields.status {
        task.status = TaskStatus::from_display(&status);
    }
    if let Some(area) = fields.area {
        task.area = area;
    }
    if !fields.responsible.is_empty() {
        task.responsible = fields.responsible;
    }
    if let Some(notes) = fields.notes {
        task.notes = notes;
    }
    if let Some(calendar) = fields.calendar {
        task.calendar_id = Some(calendar);
    }
}

fn report_write(verb: &str, result: &TaskWriteResult) {
    match &result.sync {
        SyncStatus::Synced(_) => {
            output::success(&format!("{verb} task {}", result.task.id));
        }
        SyncStatus::Degraded(message) => {
            output::success(&format!("{verb} task {}", result.task.id));
            output::warning(&format!("calendar mirror failed: {message}"));
        }
    }
}
