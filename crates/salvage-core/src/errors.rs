use thiserror::Error;

/// Result type alias using SalvageError
pub type Result<T> = std::result::Result<T, SalvageError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that shows up in run summaries,
/// structured logs and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural
    InvalidInput,
    /// Manifest bytes are not valid JSON or the root is not an object
    InvalidManifest,
    /// A required manifest field (`resource`, `entries`, `id`, `timestamp`) is absent or empty
    MissingField,
    /// A declared snapshot file does not exist next to its manifest
    MissingContent,
    InvalidTimestamp,
    NotFound,

    // Run-level
    /// The history root cannot be listed
    SourceUnavailable,
    /// The destination area cannot be created or cleared
    DestinationUnavailable,
    /// A single snapshot could not be copied into the destination area
    CopyFailed,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidManifest => "ERR_INVALID_MANIFEST",
            ExErrorKind::MissingField => "ERR_MISSING_FIELD",
            ExErrorKind::MissingContent => "ERR_MISSING_CONTENT",
            ExErrorKind::InvalidTimestamp => "ERR_INVALID_TIMESTAMP",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::SourceUnavailable => "ERR_SOURCE_UNAVAILABLE",
            ExErrorKind::DestinationUnavailable => "ERR_DESTINATION_UNAVAILABLE",
            ExErrorKind::CopyFailed => "ERR_COPY_FAILED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context
/// (operation, folder or key, filesystem path) needed to act on it.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    path: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            path: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (history folder name, blob key, logical name)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add filesystem path context
    pub fn with_path(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.path = Some(path.as_ref().display().to_string());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity: {})", entity_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain failures raised by the salvage core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SalvageError {
    // ===== Manifest Errors =====
    /// Manifest is not parseable JSON
    #[error("Manifest in {folder} is not valid JSON: {reason}")]
    ManifestParse { folder: String, reason: String },

    /// Manifest root is not a JSON object
    #[error("Manifest in {folder} is not a JSON object")]
    ManifestNotObject { folder: String },

    /// Manifest lacks a required field or the field is empty
    #[error("Manifest in {folder} has no usable '{field}' field")]
    ManifestMissingField { folder: String, field: String },

    /// A single manifest entry is unusable
    #[error("Entry #{index} in {folder} is invalid: {reason}")]
    InvalidEntry {
        folder: String,
        index: usize,
        reason: String,
    },

    /// Declared snapshot content is not present on disk
    #[error("Snapshot {snapshot_id} declared in {folder} is missing")]
    MissingSnapshot { folder: String, snapshot_id: String },

    // ===== Timestamp Errors =====
    /// Input could not be interpreted as an instant
    #[error("Cannot interpret '{input}' as a timestamp")]
    InvalidTimestamp { input: String },

    // ===== Conversation Errors =====
    /// No blob matched the requested key prefix
    #[error("No blob found with key prefix '{prefix}'")]
    BlobNotFound { prefix: String },

    /// Blob bytes are not UTF-8 text
    #[error("Blob {key} is not valid UTF-8")]
    BlobNotUtf8 { key: String },

    /// Conversation index out of range
    #[error("Timeline has {len} entries, no entry #{index}")]
    TimelineEntryNotFound { index: usize, len: usize },

    // ===== Internal Errors =====
    /// JSON (de)serialization failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Unexpected internal state
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from SalvageError to ExError
impl From<SalvageError> for ExError {
    fn from(err: SalvageError) -> Self {
        match err {
            SalvageError::ManifestParse { folder, reason } => {
                ExError::new(ExErrorKind::InvalidManifest)
                    .with_entity_id(folder)
                    .with_message(format!("Manifest is not valid JSON: {}", reason))
            }

            SalvageError::ManifestNotObject { folder } => {
                ExError::new(ExErrorKind::InvalidManifest)
                    .with_entity_id(folder)
                    .with_message("Manifest root is not an object")
            }

            SalvageError::ManifestMissingField { folder, field } => {
                ExError::new(ExErrorKind::MissingField)
                    .with_entity_id(folder)
                    .with_message(format!("Manifest has no usable '{}' field", field))
            }

            SalvageError::InvalidEntry {
                folder,
                index,
                reason,
            } => ExError::new(ExErrorKind::MissingField)
                .with_entity_id(folder)
                .with_message(format!("Entry #{}: {}", index, reason)),

            SalvageError::MissingSnapshot {
                folder,
                snapshot_id,
            } => ExError::new(ExErrorKind::MissingContent)
                .with_entity_id(folder)
                .with_message(format!("Snapshot {} is missing", snapshot_id)),

            SalvageError::InvalidTimestamp { input } => {
                ExError::new(ExErrorKind::InvalidTimestamp)
                    .with_message(format!("Cannot interpret '{}' as a timestamp", input))
            }

            SalvageError::BlobNotFound { prefix } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(prefix)
                .with_message("No blob matches key prefix"),

            SalvageError::BlobNotUtf8 { key } => ExError::new(ExErrorKind::Serialization)
                .with_entity_id(key)
                .with_message("Blob is not valid UTF-8"),

            SalvageError::TimelineEntryNotFound { index, len } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(format!(
                    "Timeline has {} entries, no entry #{}",
                    len, index
                ))
            }

            SalvageError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            SalvageError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to SalvageError
impl From<serde_json::Error> for SalvageError {
    fn from(err: serde_json::Error) -> Self {
        SalvageError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::CopyFailed)
            .with_op("materialize")
            .with_entity_id("foo.txt")
            .with_message("permission denied");

        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_COPY_FAILED]"));
        assert!(rendered.contains("materialize"));
        assert!(rendered.contains("foo.txt"));
        assert!(rendered.contains("permission denied"));
    }

    #[test]
    fn test_ex_error_path_none_by_default() {
        let err = ExError::new(ExErrorKind::NotFound);
        assert!(err.path().is_none());
        assert!(err.message().is_empty());
    }
}
