//! Point-in-time recovery command

use super::{preview, print_placements, print_summary, CliResult};
use clap::Args;
use salvage_core::conversation::format_entry;
use salvage_core::{parse_cutoff, EpochMillis, PartitionKey};
use salvage_engine::commands::conversation::{extract_conversation, ConversationOptions};
use salvage_engine::commands::recover::{recover, RecoverOptions};
use salvage_engine::SalvageConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RecoverArgs {
    /// Cutoff instant: epoch, RFC 3339, "YYYY-MM-DD HH:MM:SS", "YYYYMMDD_HHMMSS" or a date
    #[arg(long, conflicts_with = "entry")]
    pub at: Option<String>,

    /// Use conversation timeline entry N (1 = newest) as the cutoff
    #[arg(long, conflicts_with = "at")]
    pub entry: Option<usize>,

    /// Only recover files whose path contains this (case-insensitive)
    #[arg(long, conflicts_with = "all")]
    pub project: Option<String>,

    /// Recover every tracked file, from every project
    #[arg(long)]
    pub all: bool,

    /// Editor history root
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Keep same-named files from different directories apart
    #[arg(long)]
    pub by_path: bool,

    /// Key-value database used to resolve a timeline entry
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Read the database's `.backup` copy instead
    #[arg(long)]
    pub backup: bool,

    /// List every recovered file with its size and SHA256 prefix
    #[arg(long)]
    pub list: bool,
}

pub fn execute(args: RecoverArgs, config: &SalvageConfig) -> CliResult {
    let project = match (args.project, args.all) {
        (Some(p), _) if !p.trim().is_empty() => Some(p),
        (_, true) => None,
        _ => {
            return Err(
                "No project given: pass --project <name>, or --all to recover every file".into(),
            )
        }
    };

    let cutoff = match &args.at {
        Some(at) => parse_cutoff(at, config.display_zone)?,
        None => {
            let db = args.db.clone().unwrap_or_else(|| config.state_db.clone());
            cutoff_from_timeline(config, db, args.backup, args.entry.unwrap_or(1))?
        }
    };

    let options = RecoverOptions {
        history_root: args.history.unwrap_or_else(|| config.history_root.clone()),
        destination: args.out.unwrap_or_else(|| config.recovered_dir.clone()),
        cutoff,
        project,
        partition: if args.by_path {
            PartitionKey::ResourcePath
        } else {
            config.partition_by
        },
        manifest_name: config.manifest_name.clone(),
    };

    let report = recover(&options)?;

    println!(
        "Recovered as of {} into {}",
        report.cutoff.display(config.display_zone),
        report.destination.display()
    );
    if args.list {
        print_placements(&report.materialized, &report.destination);
    }
    print_summary(&report.materialized, &report.skipped);
    Ok(())
}

fn cutoff_from_timeline(
    config: &SalvageConfig,
    db: PathBuf,
    backup: bool,
    entry: usize,
) -> Result<EpochMillis, Box<dyn std::error::Error>> {
    if entry == 0 {
        return Err("Timeline entries are numbered from 1".into());
    }

    let mut options = ConversationOptions::new(if backup {
        salvage_engine::config::backup_path(&db)
    } else {
        db
    });
    options.table = config.kv_table.clone();
    options.key_prefix = config.composer_key_prefix.clone();
    options.zone = config.display_zone;

    let report = extract_conversation(&options)?;
    let cutoff = report.conversation.cutoff_for_entry(entry - 1)?;

    if let Some(chosen) = report.conversation.timeline().get(entry - 1) {
        println!(
            "Using timeline entry #{}: {}",
            entry,
            preview(&format_entry(chosen, config.display_zone), 100)
        );
    }
    Ok(cutoff)
}
