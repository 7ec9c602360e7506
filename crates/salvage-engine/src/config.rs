//! Runtime configuration
//!
//! Every path the engine touches comes from a [`SalvageConfig`]. Values are
//! resolved in this order, first hit wins:
//!
//! 1. An explicit `--config <file>`
//! 2. The `SALVAGE_CONFIG` environment variable
//! 3. `<config dir>/salvage/config.toml`, if it exists
//! 4. Built-in defaults derived from the platform's editor data location
//!
//! Fields missing from a file keep their defaults. Command-line flags
//! override individual fields afterwards.

#![allow(clippy::result_large_err)]

use salvage_core::errors::{ExError, ExErrorKind};
use salvage_core::{DisplayZone, PartitionKey};
use salvage_store::errors::Result;
use salvage_store::history::DEFAULT_MANIFEST_NAME;
use salvage_store::kv::DEFAULT_TABLE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "SALVAGE_CONFIG";
pub const DEFAULT_COMPOSER_PREFIX: &str = "composerData:";
pub const DEFAULT_MIN_BLOB_SIZE: u64 = 2048;
pub const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalvageConfig {
    /// Editor local-history root (one folder per tracked file)
    pub history_root: PathBuf,
    /// Editor key-value database holding assistant conversations
    pub state_db: PathBuf,
    /// Where point-in-time recoveries are written
    pub recovered_dir: PathBuf,
    /// Chronological staging area written by `organize`
    pub staging_dir: PathBuf,
    /// Where extracted blobs, decoded JSON and timelines go
    pub extracted_dir: PathBuf,
    pub kv_table: String,
    pub composer_key_prefix: String,
    pub min_blob_size: u64,
    pub manifest_name: String,
    pub display_zone: DisplayZone,
    pub partition_by: PartitionKey,
}

impl Default for SalvageConfig {
    fn default() -> Self {
        let user_dir = editor_user_dir();
        let output = output_root();
        Self {
            history_root: user_dir.join("History"),
            state_db: user_dir.join("globalStorage").join("state.vscdb"),
            recovered_dir: output.join("final"),
            staging_dir: output.join("_organized_history"),
            extracted_dir: output.join("extracted"),
            kv_table: DEFAULT_TABLE.to_string(),
            composer_key_prefix: DEFAULT_COMPOSER_PREFIX.to_string(),
            min_blob_size: DEFAULT_MIN_BLOB_SIZE,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            display_zone: DisplayZone::default(),
            partition_by: PartitionKey::default(),
        }
    }
}

impl SalvageConfig {
    /// Resolve configuration from an explicit file, the environment, the
    /// user config file, or defaults
    ///
    /// # Errors
    ///
    /// `Config` if a named file cannot be read or parsed. A missing
    /// user-level file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::from_file(Path::new(&path));
        }
        match user_config_file() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Read a TOML config file
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            config_error(path, format!("Cannot read config file: {}", e))
        })?;
        let config = Self::from_toml(&text).map_err(|e| e.with_path(path))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// `Config` if the text is not valid TOML for this structure.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_message(e.to_string())
        })
    }

    /// The key-value database, or its `.backup` sibling
    pub fn state_db_path(&self, use_backup: bool) -> PathBuf {
        if use_backup {
            backup_path(&self.state_db)
        } else {
            self.state_db.clone()
        }
    }
}

/// `state.vscdb` -> `state.vscdb.backup`
pub fn backup_path(db: &Path) -> PathBuf {
    let mut name = db.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// `<config dir>/salvage/config.toml`
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("salvage").join("config.toml"))
}

fn editor_user_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library/Application Support/Cursor/User"))
            .unwrap_or_else(|| PathBuf::from("Cursor/User"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .map(|c| c.join("Cursor").join("User"))
            .unwrap_or_else(|| PathBuf::from("Cursor/User"))
    }
}

fn output_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join("CursorRecovered"))
        .unwrap_or_else(|| PathBuf::from("CursorRecovered"))
}

fn config_error(path: &Path, message: String) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_path(path)
        .with_message(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_follow_editor_layout() {
        let config = SalvageConfig::default();

        assert!(config.history_root.ends_with("User/History"));
        assert!(config.state_db.ends_with("globalStorage/state.vscdb"));
        assert!(config.recovered_dir.ends_with("CursorRecovered/final"));
        assert_eq!(config.kv_table, "cursorDiskKV");
        assert_eq!(config.min_blob_size, 2048);
        assert_eq!(config.manifest_name, "entries.json");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SalvageConfig::from_toml(
            r#"
            history_root = "/data/History"
            display_zone = "utc"
            partition_by = "resource_path"
            "#,
        )
        .unwrap();

        assert_eq!(config.history_root, PathBuf::from("/data/History"));
        assert_eq!(config.display_zone, DisplayZone::Utc);
        assert_eq!(config.partition_by, PartitionKey::ResourcePath);
        assert_eq!(config.kv_table, SalvageConfig::default().kv_table);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = SalvageConfig::from_toml("history_root = [").unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIG");
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("salvage.toml");
        std::fs::write(&path, "min_blob_size = 10\n").unwrap();

        let config = SalvageConfig::load(Some(&path)).unwrap();

        assert_eq!(config.min_blob_size, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = SalvageConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIG");
    }

    #[test]
    fn test_backup_path() {
        let config = SalvageConfig {
            state_db: PathBuf::from("/x/state.vscdb"),
            ..SalvageConfig::default()
        };
        assert_eq!(
            config.state_db_path(true),
            PathBuf::from("/x/state.vscdb.backup")
        );
        assert_eq!(config.state_db_path(false), PathBuf::from("/x/state.vscdb"));
    }
}
