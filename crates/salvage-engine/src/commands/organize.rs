//! Chronological staging of every snapshot.
//!
//! Unlike `recover`, nothing is reconciled: each snapshot is copied to
//! `<staging>/<YYYYMMDD_HHMMSS>/<logical name>` (UTC capture second) so the
//! whole history can be browsed by hand.

#![allow(clippy::result_large_err)]

use super::ensure_outside_history;
use salvage_core::{log_op_end, log_op_error, log_op_start};
use salvage_core_types::RunId;
use salvage_store::destination::{Destination, Failure, MaterializeReport};
use salvage_store::errors::Result;
use salvage_store::history::{HistoryIngestor, Skipped, DEFAULT_MANIFEST_NAME};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub history_root: PathBuf,
    /// Cleared at the start of every run
    pub staging_dir: PathBuf,
    pub project: Option<String>,
    pub manifest_name: String,
}

impl OrganizeOptions {
    pub fn new(history_root: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            history_root: history_root.into(),
            staging_dir: staging_dir.into(),
            project: None,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrganizeReport {
    pub run_id: RunId,
    pub staging_dir: PathBuf,
    pub copied: MaterializeReport,
    pub skipped: Vec<Skipped>,
}

/// Copy every snapshot into a clean, time-bucketed staging area
///
/// # Errors
///
/// - `SourceUnavailable` if the history root cannot be listed
/// - `DestinationUnavailable` if the staging area overlaps the history root
///   or cannot be cleared
pub fn organize_history(options: &OrganizeOptions) -> Result<OrganizeReport> {
    let run_id = RunId::new();
    log_op_start!(
        "organize",
        run_id,
        project = options.project.as_deref().unwrap_or("*")
    );
    let start = std::time::Instant::now();

    let report = organize_impl(options, run_id.clone()).map_err(|e| {
        log_op_error!("organize", run_id, start, e.clone());
        e
    })?;

    log_op_end!(
        "organize",
        run_id,
        start,
        recovered = report.copied.written(),
        failed = report.copied.failed(),
        skipped = report.skipped.len()
    );

    Ok(report)
}

fn organize_impl(options: &OrganizeOptions, run_id: RunId) -> Result<OrganizeReport> {
    let mut ingestor = HistoryIngestor::new(&options.history_root)
        .with_manifest_name(options.manifest_name.clone());
    if let Some(project) = &options.project {
        ingestor = ingestor.with_project_filter(project.clone());
    }
    let mut ingest = ingestor.ingest()?;

    ensure_outside_history(&options.staging_dir, &options.history_root)?;
    // Identical snapshots in one second still get a file each.
    let staging = Destination::prepare_clean(&options.staging_dir)?.keep_duplicates();
    let mut copied = MaterializeReport::default();

    for record in ingest.by_ref() {
        let bucket = record.captured_at.folder_stamp();
        match staging.place(Some(&bucket), &record.logical_name, record.content_ref.path()) {
            Ok(placement) => copied.placements.push(placement),
            Err(error) => {
                tracing::warn!(
                    logical_name = %record.logical_name,
                    folder = %record.content_ref.folder,
                    err_code = error.code(),
                    "Copy failed: {}",
                    error
                );
                copied.failures.push(Failure {
                    name: format!("{}/{}", bucket, record.logical_name),
                    error,
                });
            }
        }
    }

    Ok(OrganizeReport {
        run_id,
        staging_dir: staging.root().to_path_buf(),
        copied,
        skipped: ingest.into_warnings(),
    })
}
