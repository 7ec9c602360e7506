//! Chronological staging command

use super::{print_summary, CliResult};
use clap::Args;
use salvage_engine::commands::organize::{organize_history, OrganizeOptions};
use salvage_engine::SalvageConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Only stage files whose path contains this (case-insensitive)
    #[arg(long)]
    pub project: Option<String>,

    /// Editor history root
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Staging directory (cleared first)
    #[arg(long)]
    pub staging: Option<PathBuf>,
}

pub fn execute(args: OrganizeArgs, config: &SalvageConfig) -> CliResult {
    let options = OrganizeOptions {
        history_root: args.history.unwrap_or_else(|| config.history_root.clone()),
        staging_dir: args.staging.unwrap_or_else(|| config.staging_dir.clone()),
        project: args.project.filter(|p| !p.trim().is_empty()),
        manifest_name: config.manifest_name.clone(),
    };

    let report = organize_history(&options)?;

    println!("Organized history into {}", report.staging_dir.display());
    print_summary(&report.copied, &report.skipped);
    Ok(())
}
