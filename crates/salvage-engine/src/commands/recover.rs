//! Point-in-time recovery.
//!
//! ## Pipeline (in order):
//! 1. Ingest the history root (fatal only if it cannot be listed)
//! 2. Clear the destination so the run's output replaces any earlier one
//!    (fatal if it overlaps the history root or cannot be recreated)
//! 3. Reconcile records against the cutoff
//! 4. Materialize the winners, isolating per-file copy failures

#![allow(clippy::result_large_err)]

use super::ensure_outside_history;
use salvage_core::model::{PartitionKey, ReconcileStats};
use salvage_core::{log_op_end, log_op_error, log_op_start, reconcile_by, EpochMillis};
use salvage_core_types::RunId;
use salvage_store::destination::{Destination, MaterializeReport};
use salvage_store::errors::Result;
use salvage_store::history::{HistoryIngestor, Skipped, DEFAULT_MANIFEST_NAME};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RecoverOptions {
    pub history_root: PathBuf,
    pub destination: PathBuf,
    /// Inclusive upper bound on snapshot capture time
    pub cutoff: EpochMillis,
    /// Case-insensitive substring of the resource path; `None` recovers all
    pub project: Option<String>,
    pub partition: PartitionKey,
    pub manifest_name: String,
}

impl RecoverOptions {
    pub fn new(
        history_root: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        cutoff: EpochMillis,
    ) -> Self {
        Self {
            history_root: history_root.into(),
            destination: destination.into(),
            cutoff,
            project: None,
            partition: PartitionKey::default(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoverReport {
    pub run_id: RunId,
    pub cutoff: EpochMillis,
    pub destination: PathBuf,
    pub stats: ReconcileStats,
    pub materialized: MaterializeReport,
    /// Folders and entries that contributed nothing
    pub skipped: Vec<Skipped>,
}

/// Recover every tracked file as it was at `options.cutoff`
///
/// Whatever the destination held before is removed first, so after a run it
/// contains exactly this run's recovery set.
///
/// # Errors
///
/// - `SourceUnavailable` if the history root cannot be listed
/// - `DestinationUnavailable` if the destination overlaps the history root
///   or cannot be cleared and recreated
pub fn recover(options: &RecoverOptions) -> Result<RecoverReport> {
    let run_id = RunId::new();
    log_op_start!(
        "recover",
        run_id,
        cutoff_ms = options.cutoff.as_millis(),
        project = options.project.as_deref().unwrap_or("*")
    );
    let start = std::time::Instant::now();

    let report = recover_impl(options, run_id.clone()).map_err(|e| {
        log_op_error!("recover", run_id, start, e.clone());
        e
    })?;

    log_op_end!(
        "recover",
        run_id,
        start,
        recovered = report.materialized.written(),
        unchanged = report.materialized.unchanged(),
        failed = report.materialized.failed(),
        skipped = report.skipped.len()
    );

    Ok(report)
}

fn recover_impl(options: &RecoverOptions, run_id: RunId) -> Result<RecoverReport> {
    let mut ingestor = HistoryIngestor::new(&options.history_root)
        .with_manifest_name(options.manifest_name.clone());
    if let Some(project) = &options.project {
        ingestor = ingestor.with_project_filter(project.clone());
    }
    let mut ingest = ingestor.ingest()?;

    ensure_outside_history(&options.destination, &options.history_root)?;
    let destination = Destination::prepare_clean(&options.destination)?;

    let set = reconcile_by(ingest.by_ref(), options.cutoff, options.partition);
    let materialized = destination.materialize(&set);

    Ok(RecoverReport {
        run_id,
        cutoff: options.cutoff,
        destination: destination.root().to_path_buf(),
        stats: set.stats(),
        materialized,
        skipped: ingest.into_warnings(),
    })
}
