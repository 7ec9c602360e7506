use crate::timestamp::EpochMillis;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Lazy handle to one snapshot's bytes
///
/// Holds the location only; nothing is read until the snapshot is
/// materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRef {
    /// History folder the snapshot lives in
    pub folder: String,
    /// Opaque snapshot id as declared in the manifest
    pub snapshot_id: String,
    /// Absolute path of the snapshot file
    pub path: PathBuf,
}

impl ContentRef {
    pub fn new(folder: impl Into<String>, snapshot_id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            folder: folder.into(),
            snapshot_id: snapshot_id.into(),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One observed version of one logical file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    /// Final path component of the declared resource, e.g. `main.rs`
    pub logical_name: String,
    /// Full resource path as declared by the manifest
    pub resource_path: String,
    pub captured_at: EpochMillis,
    pub content_ref: ContentRef,
}

impl SnapshotRecord {
    pub fn new(
        logical_name: impl Into<String>,
        resource_path: impl Into<String>,
        captured_at: EpochMillis,
        content_ref: ContentRef,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            resource_path: resource_path.into(),
            captured_at,
            content_ref,
        }
    }
}
