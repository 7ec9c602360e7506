//! Editor local-history ingestion
//!
//! A history root holds one folder per tracked file. Each folder contains a
//! manifest (`entries.json` by default) plus the snapshot files it declares.
//! Folders are independent: a broken one is reported and skipped.

mod ingest;

pub use ingest::{HistoryIngestor, Ingest, Skipped, DEFAULT_MANIFEST_NAME};
