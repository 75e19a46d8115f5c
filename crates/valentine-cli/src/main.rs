//! Valentine CLI - save, restore and share Valentine cards
//!
//! Drives the sync client, the local progress copy and the conflict watcher
//! from the terminal.

mod cli;
mod commands;
mod error;
mod token_store;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::fetch::run_fetch;
use crate::commands::link::run_link;
use crate::commands::progress::run_progress;
use crate::commands::save::run_save;
use crate::commands::watch::run_watch;
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "valentine=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let context = CliContext::load(&cli.global)?;
    match cli.command {
        Commands::Save(args) => run_save(args, &context).await,
        Commands::Fetch(args) => run_fetch(args, &context).await,
        Commands::Watch(args) => run_watch(args, &context).await,
        Commands::Link { save_id } => run_link(&save_id, &context),
        Commands::Progress { command } => run_progress(command, &context),
        Commands::Config { command } => run_config(command, &context),
        Commands::Completions { .. } => Ok(()),
    }
}
