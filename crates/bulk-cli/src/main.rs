//! Bulk CLI
//!
//! Thin shell over the bulk-core engine: parse arguments, set up logging,
//! dispatch to a command, render its report.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use bulk_core::{AgentTransport, Transport};

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("{} failed to set up verbose logging", "warn:".yellow().bold());
        }
    }

    let cwd = std::env::current_dir()?;
    let transport: Box<dyn Transport> = Box::new(AgentTransport::new());

    match cli.command {
        Commands::Init {
            target,
            url_template,
        } => commands::run_init(&cwd, transport, &target, &url_template),
        Commands::List { filter, projection } => {
            commands::run_list(&cwd, transport, filter.as_deref(), projection.as_deref())
        }
        Commands::Status => commands::run_status(&cwd, transport),
        Commands::Diff { remote } => commands::run_diff(&cwd, transport, remote),
        Commands::Pull => commands::run_pull(&cwd, transport),
        Commands::Push => commands::run_push(&cwd, transport),
        Commands::Reset { path } => commands::run_reset(&cwd, transport, &path),
    }
}
