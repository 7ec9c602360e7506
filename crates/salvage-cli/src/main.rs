//! Salvage CLI
//!
//! Command-line interface for recovering editor files and assistant
//! conversations from local history

use clap::{Parser, Subcommand};
use salvage_core::logging_facility::{init, Profile};
use salvage_core::DisplayZone;
use salvage_engine::SalvageConfig;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "salvage")]
#[command(
    about = "Salvage - recover editor files and assistant conversations from local history",
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML); defaults to $SALVAGE_CONFIG or the user config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format on stderr
    #[arg(long, global = true, default_value = "pretty", value_parser = ["pretty", "json"])]
    log_format: String,

    /// Show and interpret times in UTC instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Restore every tracked file as it was at a point in time
    Recover(commands::recover::RecoverArgs),
    /// Copy every snapshot into a chronological staging area
    Organize(commands::organize::OrganizeArgs),
    /// Show the assistant conversation timeline, newest first
    Timeline(commands::timeline::TimelineArgs),
    /// Raw key-value blob operations
    Blobs(commands::blobs::BlobsArgs),
}

fn main() {
    let cli = Cli::parse();
    init(Profile::from_format(&cli.log_format).unwrap_or(Profile::Development));

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> commands::CliResult {
    let mut config = SalvageConfig::load(cli.config.as_deref())?;
    if cli.utc {
        config.display_zone = DisplayZone::Utc;
    }

    match cli.command {
        Commands::Recover(args) => commands::recover::execute(args, &config),
        Commands::Organize(args) => commands::organize::execute(args, &config),
        Commands::Timeline(args) => commands::timeline::execute(args, &config),
        Commands::Blobs(args) => commands::blobs::execute(args, &config),
    }
}
