//! Conversation timeline command

use super::{preview, CliResult};
use clap::Args;
use salvage_core::conversation::format_entry;
use salvage_engine::commands::conversation::{extract_conversation, ConversationOptions};
use salvage_engine::config::backup_path;
use salvage_engine::SalvageConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// Key-value database holding the conversation
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Read the database's `.backup` copy instead
    #[arg(long)]
    pub backup: bool,

    /// Show at most N entries
    #[arg(long)]
    pub limit: Option<usize>,

    /// Also write the full timeline as text to this file
    #[arg(long)]
    pub write: Option<PathBuf>,

    /// Also write the decoded conversation blob as pretty JSON to this file
    #[arg(long)]
    pub json_out: Option<PathBuf>,
}

pub fn execute(args: TimelineArgs, config: &SalvageConfig) -> CliResult {
    let db = args.db.unwrap_or_else(|| config.state_db.clone());
    let mut options = ConversationOptions::new(if args.backup { backup_path(&db) } else { db });
    options.table = config.kv_table.clone();
    options.key_prefix = config.composer_key_prefix.clone();
    options.zone = config.display_zone;
    options.text_out = args.write;
    options.json_out = args.json_out;

    let report = extract_conversation(&options)?;
    let timeline = report.conversation.timeline();

    println!(
        "{} messages in {} ({} bytes)",
        timeline.len(),
        report.key,
        report.blob_size
    );
    for (n, entry) in timeline
        .iter()
        .take(args.limit.unwrap_or(usize::MAX))
        .enumerate()
    {
        println!(
            "#{:<4} {}",
            n + 1,
            preview(&format_entry(entry, config.display_zone), 120)
        );
    }
    Ok(())
}
