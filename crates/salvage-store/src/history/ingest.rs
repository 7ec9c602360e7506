#![allow(clippy::result_large_err)]

use crate::errors::{io_error, source_unavailable, Result};
use salvage_core::errors::ExError;
use salvage_core::model::{ContentRef, ManifestGroup, SnapshotRecord};
use salvage_core::SalvageError;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_NAME: &str = "entries.json";

/// A folder or entry that contributed nothing, and why
#[derive(Debug, Clone)]
pub struct Skipped {
    /// `<folder>` for folder-level problems, `<folder>/<id>` for entries
    pub unit: String,
    pub error: ExError,
}

/// Scans a history root for snapshot records
#[derive(Debug, Clone)]
pub struct HistoryIngestor {
    root: PathBuf,
    manifest_name: String,
    project_filter: Option<String>,
}

impl HistoryIngestor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            project_filter: None,
        }
    }

    /// Only keep folders whose resource path contains `filter` (case-insensitive)
    ///
    /// A blank filter is the same as no filter.
    pub fn with_project_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.project_filter = (!filter.trim().is_empty()).then_some(filter);
        self
    }

    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a scan
    ///
    /// Folder listing happens here; manifests are read lazily as the
    /// returned iterator advances. Entries of the root that cannot be read
    /// or inspected become warnings. Calling `ingest` again rescans.
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` if the root cannot be listed.
    pub fn ingest(&self) -> Result<Ingest> {
        let listing = fs::read_dir(&self.root).map_err(|e| source_unavailable(&self.root, e))?;

        let (folders, warnings) =
            list_folders(&self.root, listing.map(|entry| entry.map(|e| e.path())));

        tracing::debug!(
            root = %self.root.display(),
            folders = folders.len(),
            "Listed history root"
        );

        Ok(Ingest {
            manifest_name: self.manifest_name.clone(),
            project_filter: self.project_filter.clone(),
            folders: folders.into_iter(),
            pending: Vec::new().into_iter(),
            warnings,
        })
    }

    /// Drain a full scan into records and warnings
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` if the root cannot be listed.
    pub fn ingest_all(&self) -> Result<(Vec<SnapshotRecord>, Vec<Skipped>)> {
        let mut ingest = self.ingest()?;
        let records: Vec<SnapshotRecord> = ingest.by_ref().collect();
        Ok((records, ingest.into_warnings()))
    }
}

/// Immediate subdirectories of `root`, sorted by name
///
/// Plain files are not history units and are ignored. Entries that cannot
/// be read or stat'ed are returned as warnings.
fn list_folders<I>(root: &Path, entries: I) -> (Vec<(String, PathBuf)>, Vec<Skipped>)
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut folders = Vec::new();
    let mut warnings = Vec::new();

    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                let error = io_error("list_history", e).with_path(root);
                warnings.push(warn_skipped(root.display().to_string(), error));
                continue;
            }
        };
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => folders.push((name, path)),
            Ok(_) => {}
            Err(e) => {
                let error = io_error("list_history", e)
                    .with_entity_id(name.as_str())
                    .with_path(&path);
                warnings.push(warn_skipped(name, error));
            }
        }
    }

    folders.sort();
    (folders, warnings)
}

fn warn_skipped(unit: String, error: ExError) -> Skipped {
    tracing::warn!(
        folder = %unit,
        err_code = error.code(),
        "Skipping history unit: {}",
        error
    );
    Skipped { unit, error }
}

/// Lazy stream of snapshot records, folder by folder in name order
#[derive(Debug)]
pub struct Ingest {
    manifest_name: String,
    project_filter: Option<String>,
    folders: std::vec::IntoIter<(String, PathBuf)>,
    pending: std::vec::IntoIter<SnapshotRecord>,
    warnings: Vec<Skipped>,
}

impl Ingest {
    /// Warnings collected so far
    pub fn warnings(&self) -> &[Skipped] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Skipped> {
        self.warnings
    }

    fn skip(&mut self, unit: String, error: ExError) {
        self.warnings.push(warn_skipped(unit, error));
    }

    fn load_folder(&mut self, name: &str, dir: &Path) -> Vec<SnapshotRecord> {
        let manifest_path = dir.join(&self.manifest_name);
        let bytes = match fs::read(&manifest_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                let err = io_error("read_manifest", e)
                    .with_entity_id(name)
                    .with_path(&manifest_path);
                self.skip(name.to_string(), err);
                return Vec::new();
            }
        };

        let group = match ManifestGroup::parse(name, &bytes) {
            Ok(group) => group,
            Err(e) => {
                let err = ExError::from(e).with_path(&manifest_path);
                self.skip(name.to_string(), err);
                return Vec::new();
            }
        };

        if let Some(filter) = &self.project_filter {
            if !group.matches_project(filter) {
                tracing::debug!(folder = name, resource = %group.resource_path, "Not in project");
                return Vec::new();
            }
        }

        for rejected in group.rejected {
            let unit = match &rejected {
                SalvageError::InvalidEntry { index, .. } => format!("{}/#{}", name, index),
                _ => name.to_string(),
            };
            self.skip(unit, rejected.into());
        }

        let mut records = Vec::with_capacity(group.entries.len());
        for entry in group.entries {
            let content_path = dir.join(&entry.snapshot_id);
            if !content_path.is_file() {
                let err: ExError = SalvageError::MissingSnapshot {
                    folder: name.to_string(),
                    snapshot_id: entry.snapshot_id.clone(),
                }
                .into();
                self.skip(
                    format!("{}/{}", name, entry.snapshot_id),
                    err.with_path(&content_path),
                );
                continue;
            }

            records.push(SnapshotRecord::new(
                group.logical_name.clone(),
                group.resource_path.clone(),
                entry.captured_at,
                ContentRef::new(name, entry.snapshot_id, content_path),
            ));
        }

        tracing::debug!(
            folder = name,
            logical_name = %group.logical_name,
            record_count = records.len(),
            "Ingested history folder"
        );
        records
    }
}

impl Iterator for Ingest {
    type Item = SnapshotRecord;

    fn next(&mut self) -> Option<SnapshotRecord> {
        loop {
            if let Some(record) = self.pending.next() {
                return Some(record);
            }
            let (name, dir) = self.folders.next()?;
            self.pending = self.load_folder(&name, &dir).into_iter();
        }
    }
}
