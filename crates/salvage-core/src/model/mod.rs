pub mod manifest;
pub mod recovery_set;
pub mod snapshot;

pub use manifest::{logical_name_from_resource, ManifestEntry, ManifestGroup};
pub use recovery_set::{PartitionKey, ReconcileStats, RecoverySet};
pub use snapshot::{ContentRef, SnapshotRecord};
