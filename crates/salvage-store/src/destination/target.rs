//! Collision-safe target selection

#![allow(clippy::result_large_err)]

use crate::errors::{copy_failed, Result};
use salvage_core::naming::candidate_names;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Size and SHA256 of a byte sequence, hex encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub size: u64,
    pub digest: String,
}

impl Fingerprint {
    pub fn of(content: &[u8]) -> Self {
        Self {
            size: content.len() as u64,
            digest: content_digest(content),
        }
    }

    /// Fingerprint of a file on disk, hashed in a streaming pass
    ///
    /// # Errors
    ///
    /// Any I/O error from opening or reading `path`.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let size = io::copy(&mut file, &mut hasher)?;
        Ok(Self {
            size,
            digest: hex::encode(hasher.finalize()),
        })
    }
}

/// Compute SHA256 digest of content
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Where a file should go in a destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Nothing exists at this path yet
    Free(PathBuf),
    /// A file with the same bytes already exists here
    Identical(PathBuf),
}

impl Target {
    pub fn path(&self) -> &Path {
        match self {
            Target::Free(path) | Target::Identical(path) => path,
        }
    }
}

/// Pick the output path for `name` inside `dir`
///
/// Tries `name`, `name.1.ext`, `name.2.ext`, ... and stops at the first
/// free path. With `reuse` set, a candidate whose size and digest match is
/// returned as `Identical` instead of being stepped over.
///
/// # Errors
///
/// `CopyFailed` if an existing candidate cannot be inspected.
pub fn unique_target(dir: &Path, name: &str, reuse: Option<&Fingerprint>) -> Result<Target> {
    for candidate in candidate_names(name) {
        let path = dir.join(&candidate);
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Target::Free(path)),
            Err(e) => return Err(copy_failed(name, &path, e)),
        };

        let Some(wanted) = reuse else { continue };
        if !meta.is_file() || meta.len() != wanted.size {
            continue;
        }

        let existing = Fingerprint::of_file(&path).map_err(|e| copy_failed(name, &path, e))?;
        if existing == *wanted {
            return Ok(Target::Identical(path));
        }
    }
    Err(copy_failed(name, dir, "no free output name"))
}
