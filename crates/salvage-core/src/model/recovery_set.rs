use crate::model::snapshot::SnapshotRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What makes two records "the same file" during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKey {
    /// Group by final path component only
    #[default]
    LogicalName,
    /// Group by full resource path; same-named files from different
    /// directories are recovered separately and disambiguated on output
    ResourcePath,
}

impl PartitionKey {
    pub(crate) fn key_for(&self, record: &SnapshotRecord) -> SetKey {
        SetKey {
            logical_name: record.logical_name.clone(),
            discriminator: match self {
                PartitionKey::LogicalName => String::new(),
                PartitionKey::ResourcePath => record.resource_path.clone(),
            },
        }
    }
}

/// Ordering key of a RecoverySet entry: logical name first, then the
/// resource path when partitioning by path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SetKey {
    pub(crate) logical_name: String,
    pub(crate) discriminator: String,
}

/// Counters describing how a RecoverySet was reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Records seen
    pub considered: usize,
    /// Records captured after the cutoff
    pub after_cutoff: usize,
    /// Eligible records that lost to a newer (or earlier-seen equal) record
    pub superseded: usize,
}

/// One winning snapshot per partition, as of a cutoff
///
/// Iteration order is fixed: ascending logical name, then resource path.
#[derive(Debug, Clone)]
pub struct RecoverySet {
    winners: BTreeMap<SetKey, SnapshotRecord>,
    stats: ReconcileStats,
}

impl RecoverySet {
    pub(crate) fn new(winners: BTreeMap<SetKey, SnapshotRecord>, stats: ReconcileStats) -> Self {
        Self { winners, stats }
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Winning records in materialization order
    pub fn iter(&self) -> impl Iterator<Item = &SnapshotRecord> {
        self.winners.values()
    }

    /// First winner (in set order) with this logical name
    pub fn get(&self, logical_name: &str) -> Option<&SnapshotRecord> {
        self.iter().find(|r| r.logical_name == logical_name)
    }
}
