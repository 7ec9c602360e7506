//! Read-only access to the editor's key-value blob database
//!
//! The database is a SQLite file with a two-column table (`cursorDiskKV`
//! by default): `key` (TEXT or BLOB) and `value` (BLOB). Assistant
//! conversations live under keys prefixed with `composerData:`.

#![allow(clippy::result_large_err)]

use crate::errors::{database_missing, from_rusqlite, invalid_table, io_error, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DEFAULT_TABLE: &str = "cursorDiskKV";

/// Matches keys starting with `?1`, whether stored as TEXT or BLOB
const PREFIX_MATCH: &str = "substr(CAST(key AS TEXT), 1, length(?1)) = ?1";

pub struct KvBlobStore {
    // Declared before `scratch` so the connection closes before the
    // scratch directory is removed.
    conn: Connection,
    table: String,
    path: PathBuf,
    scratch: Option<TempDir>,
}

impl std::fmt::Debug for KvBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvBlobStore")
            .field("table", &self.table)
            .field("path", &self.path)
            .field("snapshot", &self.scratch.is_some())
            .finish()
    }
}

impl KvBlobStore {
    /// Open `path` read-only
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `table` is not an identifier
    /// - `SourceUnavailable` if the file does not exist
    /// - `Persistence` if SQLite cannot open it
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref();
        validate_table(table)?;
        if !path.is_file() {
            return Err(database_missing(path));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| from_rusqlite(e).with_path(path))?;

        Ok(Self {
            conn,
            table: table.to_string(),
            path: path.to_path_buf(),
            scratch: None,
        })
    }

    /// Copy the database (with its `-wal`/`-shm` siblings) to a private
    /// scratch directory and open the copy
    ///
    /// The copy is removed when the store is dropped.
    ///
    /// # Errors
    ///
    /// As [`KvBlobStore::open`], plus `Io` if the copy fails.
    pub fn open_snapshot(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref();
        validate_table(table)?;
        if !path.is_file() {
            return Err(database_missing(path));
        }

        let scratch = TempDir::new().map_err(|e| io_error("kv_snapshot", e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("state.vscdb"));
        let copy = scratch.path().join(&file_name);
        fs::copy(path, &copy).map_err(|e| io_error("kv_snapshot", e).with_path(path))?;

        for suffix in ["-wal", "-shm"] {
            let sibling = with_suffix(path, suffix);
            if sibling.is_file() {
                fs::copy(&sibling, with_suffix(&copy, suffix))
                    .map_err(|e| io_error("kv_snapshot", e).with_path(&sibling))?;
            }
        }

        // Read-write on the private copy so SQLite can replay a copied WAL.
        let conn = Connection::open(&copy).map_err(|e| from_rusqlite(e).with_path(path))?;

        tracing::debug!(
            source = %path.display(),
            copy = %copy.display(),
            "Opened blob database snapshot"
        );

        Ok(Self {
            conn,
            table: table.to_string(),
            path: path.to_path_buf(),
            scratch: Some(scratch),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Path of the database this store was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key with the largest value among keys starting with `prefix`
    ///
    /// # Errors
    ///
    /// `Persistence` on SQLite failure (including a missing table).
    pub fn largest_key_with_prefix(&self, prefix: &str) -> Result<Option<(String, u64)>> {
        let sql = format!(
            "SELECT key, length(CAST(value AS BLOB)) AS size FROM {} WHERE {} \
             ORDER BY size DESC, CAST(key AS TEXT) ASC LIMIT 1",
            self.table, PREFIX_MATCH
        );
        self.conn
            .query_row(&sql, params![prefix], |row| {
                Ok((key_at(row, 0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0) as u64))
            })
            .optional()
            .map_err(from_rusqlite)
    }

    /// Value stored under `key`
    ///
    /// # Errors
    ///
    /// `Persistence` on SQLite failure.
    pub fn value(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let sql = format!(
            "SELECT value FROM {} WHERE CAST(key AS TEXT) = ?1 LIMIT 1",
            self.table
        );
        self.conn
            .query_row(&sql, params![key], |row| value_at(row, 0))
            .optional()
            .map_err(from_rusqlite)
    }

    /// Largest value among keys starting with `prefix`, with its key
    ///
    /// # Errors
    ///
    /// `Persistence` on SQLite failure.
    pub fn largest_value_with_prefix(&self, prefix: &str) -> Result<Option<(String, Vec<u8>)>> {
        let sql = format!(
            "SELECT key, value FROM {} WHERE {} \
             ORDER BY length(CAST(value AS BLOB)) DESC, CAST(key AS TEXT) ASC LIMIT 1",
            self.table, PREFIX_MATCH
        );
        self.conn
            .query_row(&sql, params![prefix], |row| {
                Ok((key_at(row, 0)?, value_at(row, 1)?))
            })
            .optional()
            .map_err(from_rusqlite)
    }

    /// All entries starting with `prefix` whose value is at least
    /// `min_size` bytes, ordered by key
    ///
    /// An empty prefix matches every key.
    ///
    /// # Errors
    ///
    /// `Persistence` on SQLite failure.
    pub fn entries_with_prefix(&self, prefix: &str, min_size: u64) -> Result<Vec<(String, Vec<u8>)>> {
        let sql = format!(
            "SELECT key, value FROM {} WHERE {} AND length(CAST(value AS BLOB)) >= ?2 \
             ORDER BY CAST(key AS TEXT) ASC",
            self.table, PREFIX_MATCH
        );
        let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
        let min_size = i64::try_from(min_size).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![prefix, min_size], |row| {
                Ok((key_at(row, 0)?, value_at(row, 1)?))
            })
            .map_err(from_rusqlite)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)
    }
}

fn validate_table(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(invalid_table(table))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn key_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Null => String::new(),
    })
}

fn value_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
        ValueRef::Integer(i) => i.to_string().into_bytes(),
        ValueRef::Real(f) => f.to_string().into_bytes(),
        ValueRef::Null => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table() {
        assert!(validate_table("cursorDiskKV").is_ok());
        assert!(validate_table("_t1").is_ok());
        assert!(validate_table("").is_err());
        assert!(validate_table("1abc").is_err());
        assert!(validate_table("kv; DROP TABLE x").is_err());
        assert!(validate_table("a-b").is_err());
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("/x/state.vscdb"), "-wal"),
            PathBuf::from("/x/state.vscdb-wal")
        );
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = KvBlobStore::open(dir.path().join("none.db"), DEFAULT_TABLE).unwrap_err();
        assert_eq!(err.code(), "ERR_SOURCE_UNAVAILABLE");
    }
}
