//! CLI entry point for the callsheet production tracker.

mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Project-root .env carries the sheet/calendar endpoints and tokens.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::init(cli.output);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
        }))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = commands::handle(cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
