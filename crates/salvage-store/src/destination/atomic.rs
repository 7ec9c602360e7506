//! Atomic copy primitive
//!
//! Uses temp→rename in the target directory so a failed copy never leaves a
//! partial file behind.

#![allow(clippy::result_large_err)]

use crate::errors::{copy_failed, Result};
use filetime::FileTime;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Atomically write `content` to `target`, carrying over the source's
/// permissions and modification time
///
/// `target` must not exist; callers pick a free name first.
pub fn atomic_copy(source_meta: &fs::Metadata, content: &[u8], target: &Path) -> Result<()> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = target
        .parent()
        .ok_or_else(|| copy_failed(&name, target, "target has no parent directory"))?;

    let fail = |e: std::io::Error| copy_failed(&name, target, e);

    // Dropping the temp file on any early return removes it.
    let mut temp = tempfile::Builder::new()
        .prefix(".salvage-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(fail)?;
    temp.write_all(content).map_err(fail)?;
    temp.as_file().sync_all().map_err(fail)?;

    fs::set_permissions(temp.path(), source_meta.permissions()).map_err(fail)?;
    filetime::set_file_mtime(
        temp.path(),
        FileTime::from_last_modification_time(source_meta),
    )
    .map_err(fail)?;

    temp.persist_noclobber(target)
        .map_err(|e| copy_failed(&name, target, e.error))?;

    Ok(())
}
