//! Error handling for salvage-store
//!
//! Wraps salvage-core ExError with store-specific helpers

use salvage_core::errors::{ExError, ExErrorKind};
use std::fmt::Display;
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// The history root cannot be listed
pub fn source_unavailable(path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::SourceUnavailable)
        .with_op("ingest")
        .with_path(path)
        .with_message(format!("Cannot list history root: {}", err))
}

/// A destination area cannot be created or cleared
pub fn destination_unavailable(path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::DestinationUnavailable)
        .with_op("prepare_destination")
        .with_path(path)
        .with_message(err.to_string())
}

/// A single snapshot could not be placed in the destination
pub fn copy_failed(name: &str, path: &Path, reason: impl Display) -> ExError {
    ExError::new(ExErrorKind::CopyFailed)
        .with_op("copy_snapshot")
        .with_entity_id(name)
        .with_path(path)
        .with_message(reason.to_string())
}

/// A table name that is not a plain SQL identifier
pub fn invalid_table(table: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("kv_open")
        .with_entity_id(table)
        .with_message("Table name must be an identifier ([A-Za-z_][A-Za-z0-9_]*)")
}

/// The blob database file is absent
pub fn database_missing(path: &Path) -> ExError {
    ExError::new(ExErrorKind::SourceUnavailable)
        .with_op("kv_open")
        .with_path(path)
        .with_message("Database file does not exist")
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
