//! apitester CLI
//!
//! Command-line front end for the domain-state snapshot engine

use apitester_core::logging_facility::{self, Profile};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "apitester")]
#[command(about = "apitester - snapshot and diff backend state around API requests", long_about = None)]
struct Cli {
    /// Logging profile: dev, prod or test (logs go to stderr)
    #[arg(long, global = true, default_value = "dev")]
    log: Profile,

    /// Backend settings file (default: ./apitester.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the known entity types
    Types(commands::types::TypesArgs),
    /// Structural diff of two JSON files
    Diff(commands::diff::DiffArgs),
    /// Snapshot, send a request, snapshot again and diff
    Probe(commands::probe::ProbeArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log);

    let result = match cli.command {
        Commands::Types(args) => commands::types::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Probe(args) => commands::probe::execute(args, cli.config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
