//! Salvage Store - filesystem and SQLite access for recovery
//!
//! Provides:
//! - History folder ingestion (manifests to snapshot records)
//! - Destination areas with atomic, collision-safe copies
//! - Read-only access to the editor's key-value blob database

pub mod destination;
pub mod errors;
pub mod history;
pub mod kv;

// Re-export key types
pub use destination::{Destination, Failure, MaterializeReport, Outcome, Placement};
pub use errors::Result;
pub use history::{HistoryIngestor, Ingest, Skipped};
pub use kv::KvBlobStore;
