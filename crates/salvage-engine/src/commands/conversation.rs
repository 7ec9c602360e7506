//! Assistant conversation extraction.
//!
//! The editor keeps each composer session as one JSON blob in its
//! key-value database. The largest `composerData:` blob is taken to be the
//! session worth recovering; its message timeline is what users pick a
//! recovery cutoff from.

#![allow(clippy::result_large_err)]

use salvage_core::errors::ExError;
use salvage_core::{log_op_end, log_op_error, log_op_start};
use salvage_core::{Conversation, DisplayZone, SalvageError};
use salvage_core_types::RunId;
use salvage_store::errors::{io_error, Result};
use salvage_store::kv::{KvBlobStore, DEFAULT_TABLE};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_COMPOSER_PREFIX, DEFAULT_MIN_BLOB_SIZE};

#[derive(Debug, Clone)]
pub struct ConversationOptions {
    pub db_path: PathBuf,
    pub table: String,
    pub key_prefix: String,
    /// Write the decoded blob here as pretty JSON
    pub json_out: Option<PathBuf>,
    /// Write the rendered timeline here
    pub text_out: Option<PathBuf>,
    pub zone: DisplayZone,
}

impl ConversationOptions {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            table: DEFAULT_TABLE.to_string(),
            key_prefix: DEFAULT_COMPOSER_PREFIX.to_string(),
            json_out: None,
            text_out: None,
            zone: DisplayZone::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationReport {
    pub run_id: RunId,
    /// Key of the blob the conversation came from
    pub key: String,
    pub blob_size: usize,
    pub conversation: Conversation,
}

/// Load the largest composer conversation from a key-value database
///
/// The database is read through a private copy so a running editor is
/// never locked out.
///
/// # Errors
///
/// - `SourceUnavailable` if the database file is missing
/// - `NotFound` if no key starts with the composer prefix
/// - `Serialization` if the blob is not UTF-8 JSON
/// - `Io` if an output file cannot be written
pub fn extract_conversation(options: &ConversationOptions) -> Result<ConversationReport> {
    let run_id = RunId::new();
    log_op_start!(
        "extract_conversation",
        run_id,
        db = %options.db_path.display()
    );
    let start = std::time::Instant::now();

    let report = extract_conversation_impl(options, run_id.clone()).map_err(|e| {
        log_op_error!("extract_conversation", run_id, start, e.clone());
        e
    })?;

    log_op_end!(
        "extract_conversation",
        run_id,
        start,
        blob_key = report.key.as_str(),
        record_count = report.conversation.len()
    );

    Ok(report)
}

fn extract_conversation_impl(
    options: &ConversationOptions,
    run_id: RunId,
) -> Result<ConversationReport> {
    let store = KvBlobStore::open_snapshot(&options.db_path, &options.table)?;
    let (key, bytes) = store
        .largest_value_with_prefix(&options.key_prefix)?
        .ok_or_else(|| {
            ExError::from(SalvageError::BlobNotFound {
                prefix: options.key_prefix.clone(),
            })
            .with_path(&options.db_path)
        })?;

    let value = decode_blob(&key, &bytes)?;
    let conversation = Conversation::from_json(&value).map_err(ExError::from)?;

    if let Some(path) = &options.json_out {
        write_output(path, pretty_json(&value)?.as_bytes())?;
    }
    if let Some(path) = &options.text_out {
        write_output(path, conversation.render_text(options.zone).as_bytes())?;
    }

    Ok(ConversationReport {
        run_id,
        key,
        blob_size: bytes.len(),
        conversation,
    })
}

#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub db_path: PathBuf,
    pub table: String,
    /// Only keys starting with this are dumped; empty dumps every key
    pub key_prefix: String,
    pub min_size: u64,
    pub out_dir: PathBuf,
}

impl DumpOptions {
    pub fn new(db_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            table: DEFAULT_TABLE.to_string(),
            key_prefix: String::new(),
            min_size: DEFAULT_MIN_BLOB_SIZE,
            out_dir: out_dir.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DumpedBlob {
    pub key: String,
    pub path: PathBuf,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct DumpReport {
    pub run_id: RunId,
    pub out_dir: PathBuf,
    pub blobs: Vec<DumpedBlob>,
}

impl DumpReport {
    pub fn total_bytes(&self) -> usize {
        self.blobs.iter().map(|b| b.size).sum()
    }
}

/// Write every blob of at least `min_size` bytes to `<out>/<key>.bin`
///
/// Characters that cannot appear in a file name (`:`, `/`, `\`) are
/// replaced with `_`.
///
/// # Errors
///
/// - `SourceUnavailable` if the database file is missing
/// - `Persistence` on SQLite failure
/// - `Io` if the output directory or a file cannot be written
pub fn dump_blobs(options: &DumpOptions) -> Result<DumpReport> {
    let run_id = RunId::new();
    log_op_start!(
        "dump_blobs",
        run_id,
        min_size = options.min_size
    );
    let start = std::time::Instant::now();

    let report = dump_blobs_impl(options, run_id.clone()).map_err(|e| {
        log_op_error!("dump_blobs", run_id, start, e.clone());
        e
    })?;

    log_op_end!(
        "dump_blobs",
        run_id,
        start,
        record_count = report.blobs.len()
    );

    Ok(report)
}

fn dump_blobs_impl(options: &DumpOptions, run_id: RunId) -> Result<DumpReport> {
    let store = KvBlobStore::open_snapshot(&options.db_path, &options.table)?;
    let entries = store.entries_with_prefix(&options.key_prefix, options.min_size)?;

    fs::create_dir_all(&options.out_dir)
        .map_err(|e| io_error("dump_blobs", e).with_path(&options.out_dir))?;

    let mut blobs = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let path = options.out_dir.join(format!("{}.bin", safe_file_stem(&key)));
        fs::write(&path, &value).map_err(|e| {
            io_error("dump_blobs", e)
                .with_entity_id(key.as_str())
                .with_path(&path)
        })?;
        tracing::debug!(blob_key = %key, size = value.len(), "Dumped blob");
        blobs.push(DumpedBlob {
            key,
            path,
            size: value.len(),
        });
    }

    Ok(DumpReport {
        run_id,
        out_dir: options.out_dir.clone(),
        blobs,
    })
}

/// Decode a raw blob file into pretty-printed JSON
///
/// Non-ASCII text is written as-is, not escaped.
///
/// # Errors
///
/// - `Io` if the input cannot be read or the output cannot be written
/// - `Serialization` if the input is not UTF-8 JSON
pub fn decode_blob_file(input: &Path, output: &Path) -> Result<()> {
    let run_id = RunId::new();
    log_op_start!(
        "decode_blob",
        run_id,
        input = %input.display()
    );
    let start = std::time::Instant::now();

    decode_blob_file_impl(input, output).map_err(|e| {
        log_op_error!("decode_blob", run_id, start, e.clone());
        e
    })?;

    log_op_end!(
        "decode_blob",
        run_id,
        start
    );

    Ok(())
}

fn decode_blob_file_impl(input: &Path, output: &Path) -> Result<()> {
    let bytes = fs::read(input).map_err(|e| io_error("decode_blob", e).with_path(input))?;
    let value = decode_blob(&input.display().to_string(), &bytes)?;
    write_output(output, pretty_json(&value)?.as_bytes())
}

/// Parse blob bytes as UTF-8 JSON
///
/// # Errors
///
/// `Serialization` if the bytes are not UTF-8 or not JSON.
pub fn decode_blob(key: &str, bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes).map_err(|_| {
        ExError::from(SalvageError::BlobNotUtf8 {
            key: key.to_string(),
        })
    })?;
    serde_json::from_str(text)
        .map_err(|e| ExError::from(SalvageError::from(e)).with_entity_id(key))
}

fn pretty_json(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| ExError::from(SalvageError::from(e)))
}

fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error("write_output", e).with_path(parent))?;
    }
    fs::write(path, content).map_err(|e| io_error("write_output", e).with_path(path))
}

fn safe_file_stem(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}
