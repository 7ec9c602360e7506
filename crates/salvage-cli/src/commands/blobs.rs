//! Raw blob commands

use super::CliResult;
use clap::{Args, Subcommand};
use salvage_engine::commands::conversation::{decode_blob_file, dump_blobs, DumpOptions};
use salvage_engine::config::backup_path;
use salvage_engine::SalvageConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct BlobsArgs {
    #[command(subcommand)]
    pub command: BlobsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BlobsCommand {
    /// Write every large blob to `<out>/<key>.bin`
    Dump(DumpArgs),
    /// Decode a raw blob file into pretty JSON
    Decode(DecodeArgs),
}

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Key-value database
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Read the database's `.backup` copy instead
    #[arg(long)]
    pub backup: bool,

    /// Smallest blob to dump, in bytes
    #[arg(long)]
    pub min_size: Option<u64>,

    /// Only dump keys starting with this
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Output directory
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Raw blob file
    pub input: PathBuf,
    /// JSON file to write
    pub output: PathBuf,
}

pub fn execute(args: BlobsArgs, config: &SalvageConfig) -> CliResult {
    match args.command {
        BlobsCommand::Dump(dump_args) => execute_dump(dump_args, config),
        BlobsCommand::Decode(decode_args) => execute_decode(decode_args),
    }
}

fn execute_dump(args: DumpArgs, config: &SalvageConfig) -> CliResult {
    let db = args.db.unwrap_or_else(|| config.state_db.clone());
    let mut options = DumpOptions::new(
        if args.backup { backup_path(&db) } else { db },
        args.out
            .unwrap_or_else(|| config.extracted_dir.join("blobs")),
    );
    options.table = config.kv_table.clone();
    options.key_prefix = args.prefix;
    options.min_size = args.min_size.unwrap_or(config.min_blob_size);

    let report = dump_blobs(&options)?;

    println!(
        "Dumped {} blobs ({} bytes) into {}",
        report.blobs.len(),
        report.total_bytes(),
        report.out_dir.display()
    );
    for blob in &report.blobs {
        println!("  {} ({} bytes)", blob.key, blob.size);
    }
    Ok(())
}

fn execute_decode(args: DecodeArgs) -> CliResult {
    decode_blob_file(&args.input, &args.output)?;
    println!("Decoded {} -> {}", args.input.display(), args.output.display());
    Ok(())
}
