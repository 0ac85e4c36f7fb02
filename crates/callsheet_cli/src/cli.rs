//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Film-crew production tracker: tasks in a spreadsheet, mirrored to a calendar
#[derive(Parser)]
#[command(name = "callsheet", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: text (human-readable) or json (machine-readable)
    #[arg(short, long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output for humans
    #[default]
    Text,
    /// Structured JSON for scripts and machine consumption
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision or heal the spreadsheet schema
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Create, list, and edit tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Re-mirror every scheduled task and sweep orphaned events
    Sync {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Sweep orphaned calendar events without touching live ones
    Reconcile {
        #[command(flatten)]
        window: WindowArgs,
    },
}

#[derive(Subcommand)]
pub enum SchemaAction {
    /// Create missing tables and backfill trailing header columns
    Ensure,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Merged view of spreadsheet rows and calendar events
    List {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Show one task by id
    Show {
        /// Task id
        id: String,
    },
    /// Create a task (id is generated when omitted)
    Create {
        /// Task title
        title: String,
        #[command(flatten)]
        fields: TaskFields,
        /// Explicit task id
        #[arg(long)]
        id: Option<String>,
    },
    /// Update an existing task
    Update {
        /// Task id
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// Remove the schedule (the mirrored event is reaped)
        #[arg(long, conflicts_with = "date")]
        unschedule: bool,
    },
    /// Delete a task and its mirrored event
    Delete {
        /// Task id
        id: String,
    },
}

#[derive(Args)]
pub struct TaskFields {
    /// Scheduled date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    /// Scheduled time, 24-hour HH:MM (requires --date)
    #[arg(long, requires = "date")]
    pub time: Option<String>,
    /// Status: Pending, In Progress, Completed, Blocked
    #[arg(long)]
    pub status: Option<String>,
    /// Production area (Camera, Art, Sound, ...)
    #[arg(long)]
    pub area: Option<String>,
    /// Responsible person (repeatable)
    #[arg(long = "responsible")]
    pub responsible: Vec<String>,
    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
    /// Named calendar for this task's event (default: the primary)
    #[arg(long)]
    pub calendar: Option<String>,
}

#[derive(Args, Clone, Copy)]
pub struct WindowArgs {
    /// Window start, YYYY-MM-DD (default: first day of last month)
    #[arg(long)]
    pub from: Option<chrono::NaiveDate>,
    /// Window end (exclusive), YYYY-MM-DD (default: a year from now)
    #[arg(long)]
    pub to: Option<chrono::NaiveDate>,
}
