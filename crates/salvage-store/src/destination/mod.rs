//! Destination areas
//!
//! Provides:
//! - Directory preparation (create, or clear then create)
//! - Collision-safe placement of snapshot bytes, reusing identical files
//!   unless duplicates are requested
//! - Materialization of a whole `RecoverySet` with per-file failure isolation

#![allow(clippy::result_large_err)]

mod atomic;
mod target;

pub use atomic::atomic_copy;
pub use target::{content_digest, unique_target, Fingerprint, Target};

use crate::errors::{copy_failed, destination_unavailable, Result};
use salvage_core::errors::ExError;
use salvage_core::model::RecoverySet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Result of placing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// New file written
    Written,
    /// A file with identical bytes was already there
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Placement {
    pub logical_name: String,
    pub target: PathBuf,
    pub outcome: Outcome,
    /// SHA256 of the placed bytes, hex encoded
    pub digest: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct Failure {
    pub name: String,
    pub error: ExError,
}

#[derive(Debug, Clone, Default)]
pub struct MaterializeReport {
    pub placements: Vec<Placement>,
    pub failures: Vec<Failure>,
}

impl MaterializeReport {
    /// Files newly written
    pub fn written(&self) -> usize {
        self.count(Outcome::Written)
    }

    /// Files already present with identical bytes
    pub fn unchanged(&self) -> usize {
        self.count(Outcome::Unchanged)
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.placements
            .iter()
            .filter(|p| p.outcome == outcome)
            .count()
    }
}

/// A directory that recovered files are copied into
#[derive(Debug, Clone)]
pub struct Destination {
    root: PathBuf,
    reuse_identical: bool,
}

impl Destination {
    /// Create `root` (and parents) if needed
    ///
    /// # Errors
    ///
    /// `DestinationUnavailable` if the directory cannot be created.
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| destination_unavailable(&root, e))?;
        Ok(Self {
            root,
            reuse_identical: true,
        })
    }

    /// Remove everything under `root`, then create it empty
    ///
    /// # Errors
    ///
    /// `DestinationUnavailable` if the directory cannot be cleared or created.
    pub fn prepare_clean(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        match fs::remove_dir_all(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(destination_unavailable(&root, e)),
        }
        Self::prepare(root)
    }

    /// Give every placement its own file, even when an existing file
    /// already holds the same bytes
    pub fn keep_duplicates(mut self) -> Self {
        self.reuse_identical = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `source` into the destination as `name`
    ///
    /// `subdir` is created under the root when given. The name is
    /// disambiguated against whatever is already there; an existing file
    /// with the same size and digest is reported `Unchanged` unless this
    /// destination keeps duplicates.
    ///
    /// # Errors
    ///
    /// `CopyFailed` if the source cannot be read or the copy cannot be
    /// completed. Nothing partial is left behind.
    pub fn place(&self, subdir: Option<&str>, name: &str, source: &Path) -> Result<Placement> {
        let dir = match subdir {
            Some(sub) => self.root.join(sub),
            None => self.root.clone(),
        };
        fs::create_dir_all(&dir).map_err(|e| copy_failed(name, &dir, e))?;

        let meta = fs::metadata(source).map_err(|e| copy_failed(name, source, e))?;
        let content = fs::read(source).map_err(|e| copy_failed(name, source, e))?;

        let fingerprint = Fingerprint::of(&content);
        let reuse = self.reuse_identical.then_some(&fingerprint);

        let (target, outcome) = match unique_target(&dir, name, reuse)? {
            Target::Identical(path) => (path, Outcome::Unchanged),
            Target::Free(path) => {
                atomic_copy(&meta, &content, &path)?;
                (path, Outcome::Written)
            }
        };

        tracing::debug!(
            logical_name = name,
            target = %target.display(),
            outcome = ?outcome,
            digest = %fingerprint.digest,
            "Placed snapshot"
        );

        Ok(Placement {
            logical_name: name.to_string(),
            target,
            outcome,
            digest: fingerprint.digest,
            size: fingerprint.size,
        })
    }

    /// Copy every winner of `set` into the root, in set order
    ///
    /// A failed copy is recorded and the remaining records are still
    /// processed.
    pub fn materialize(&self, set: &RecoverySet) -> MaterializeReport {
        let mut report = MaterializeReport::default();

        for record in set.iter() {
            match self.place(None, &record.logical_name, record.content_ref.path()) {
                Ok(placement) => report.placements.push(placement),
                Err(error) => {
                    tracing::warn!(
                        logical_name = %record.logical_name,
                        err_code = error.code(),
                        "Copy failed: {}",
                        error
                    );
                    report.failures.push(Failure {
                        name: record.logical_name.clone(),
                        error,
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_clean_empties_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("staging");
        fs::create_dir_all(root.join("old")).unwrap();
        fs::write(root.join("old").join("f.txt"), b"x").unwrap();

        let dest = Destination::prepare_clean(&root).unwrap();

        assert!(dest.root().is_dir());
        assert_eq!(fs::read_dir(dest.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_fails_on_file_in_the_way() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("out");
        fs::write(&blocker, b"file").unwrap();

        let err = Destination::prepare(&blocker).unwrap_err();

        assert_eq!(err.code(), "ERR_DESTINATION_UNAVAILABLE");
    }

    #[test]
    fn test_place_into_subdir() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("snap");
        fs::write(&source, b"body").unwrap();
        let dest = Destination::prepare(temp_dir.path().join("out")).unwrap();

        let placement = dest
            .place(Some("20240315_142200"), "main.rs", &source)
            .unwrap();

        assert_eq!(
            placement.target,
            dest.root().join("20240315_142200").join("main.rs")
        );
        assert_eq!(placement.outcome, Outcome::Written);
        assert_eq!(placement.size, 4);
    }

    #[test]
    fn test_place_missing_source_is_copy_failure() {
        let temp_dir = TempDir::new().unwrap();
        let dest = Destination::prepare(temp_dir.path().join("out")).unwrap();

        let err = dest
            .place(None, "gone.rs", &temp_dir.path().join("gone"))
            .unwrap_err();

        assert_eq!(err.code(), "ERR_COPY_FAILED");
        assert_eq!(err.entity_id(), Some("gone.rs"));
    }

    #[test]
    fn test_place_reports_digest_of_placed_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("snap");
        fs::write(&source, b"test").unwrap();
        let dest = Destination::prepare(temp_dir.path().join("out")).unwrap();

        let placement = dest.place(None, "t.txt", &source).unwrap();

        assert_eq!(
            placement.digest,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
        assert_eq!(placement.digest, content_digest(&fs::read(&placement.target).unwrap()));
    }

    #[test]
    fn test_identical_bytes_reuse_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("snap");
        fs::write(&source, b"same").unwrap();
        let dest = Destination::prepare(temp_dir.path().join("out")).unwrap();

        dest.place(None, "a.txt", &source).unwrap();
        let second = dest.place(None, "a.txt", &source).unwrap();

        assert_eq!(second.outcome, Outcome::Unchanged);
        assert_eq!(second.target, dest.root().join("a.txt"));
    }

    #[test]
    fn test_keep_duplicates_writes_a_second_copy() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("snap");
        fs::write(&source, b"same").unwrap();
        let dest = Destination::prepare(temp_dir.path().join("out"))
            .unwrap()
            .keep_duplicates();

        dest.place(None, "a.txt", &source).unwrap();
        let second = dest.place(None, "a.txt", &source).unwrap();

        assert_eq!(second.outcome, Outcome::Written);
        assert_eq!(second.target, dest.root().join("a.1.txt"));
        assert_eq!(fs::read(&second.target).unwrap(), b"same");
    }
}
