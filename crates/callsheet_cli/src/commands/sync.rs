//! `callsheet sync` and `callsheet reconcile`.

use anyhow::Result;

use callsheet_runtime::TaskService;
use callsheet_sync::rowstore::RestSheet;
use callsheet_sync::ReconcileReport;

use crate::cli::WindowArgs;
use crate::commands::resolve_window;
use crate::output;

pub async fn sync(service: &TaskService<RestSheet>, window: WindowArgs) -> Result<()> {
    let report = service.sync_now(Some(resolve_window(window))).await?;

    output::header("sync sweep");
    output::kv("mirrored", &report.upserted.to_string());
    output::kv("unscheduled", &report.skipped.to_string());
    for (task_id, message) in &report.failures {
        output::warning(&format!("task {task_id}: {message}"));
    }
    print_reconcile(&report.reconcile);
    Ok(())
}

pub async fn reconcile(service: &TaskService<RestSheet>, window: WindowArgs) -> Result<()> {
    let report = service.reconcile_now(Some(resolve_window(window))).await?;
    print_reconcile(&report);
    Ok(())
}

fn print_reconcile(report: &ReconcileReport) {
    output::kv("events scanned", &report.scanned.to_string());
    output::kv("orphans deleted", &report.deleted.to_string());
    for failure in &report.failures {
        output::warning(&format!(
            "event {} (task {}): {}",
            failure.event_id, failure.task_id, failure.message
        ));
    }
    if report.is_clean() {
        output::success("calendar is consistent with the row store");
    }
}
