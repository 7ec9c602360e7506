//! Salvage Core - recovery domain kernel
//!
//! This crate provides the I/O-free parts of editor history recovery:
//! - Snapshot records, history manifests and recovery sets
//! - Point-in-time reconciliation (newest snapshot per file at a cutoff)
//! - Output name disambiguation
//! - Timestamp normalization across units and formats
//! - Assistant conversation timelines
//! - The error and logging facilities shared by every salvage crate

pub mod conversation;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod naming;
pub mod reconcile;
pub mod timestamp;

#[doc(hidden)]
pub use salvage_core_types::schema as __schema;

// Re-export commonly used types
pub use conversation::{Conversation, ConversationEntry, Speaker};
pub use errors::{ExError, ExErrorKind, Result, SalvageError};
pub use model::{
    ContentRef, ManifestEntry, ManifestGroup, PartitionKey, ReconcileStats, RecoverySet,
    SnapshotRecord,
};
pub use reconcile::{reconcile, reconcile_by};
pub use timestamp::{parse_cutoff, DisplayZone, EpochMillis};
