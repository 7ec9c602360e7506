//! Point-in-time snapshot reconciliation.
//!
//! Given every known snapshot of every file and a cutoff instant, pick the
//! newest snapshot at or before the cutoff for each file.
//!
//! ## Rules
//!
//! 1. Partition records by [`PartitionKey`] (logical name by default).
//! 2. Drop records captured after the cutoff.
//! 3. Keep the record with the greatest `captured_at`. On equal timestamps
//!    the record seen first in the input wins, so the result is a pure
//!    function of input order.
//! 4. Partitions left empty by the cutoff are absent from the result.
//!
//! Materialization of the winners lives in `salvage-store`.

use crate::model::recovery_set::SetKey;
use crate::model::{PartitionKey, ReconcileStats, RecoverySet, SnapshotRecord};
use crate::timestamp::EpochMillis;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Reconcile records by logical name
pub fn reconcile<I>(records: I, cutoff: EpochMillis) -> RecoverySet
where
    I: IntoIterator<Item = SnapshotRecord>,
{
    reconcile_by(records, cutoff, PartitionKey::LogicalName)
}

/// Reconcile records with an explicit partition key
pub fn reconcile_by<I>(records: I, cutoff: EpochMillis, partition: PartitionKey) -> RecoverySet
where
    I: IntoIterator<Item = SnapshotRecord>,
{
    let mut winners: BTreeMap<SetKey, SnapshotRecord> = BTreeMap::new();
    let mut stats = ReconcileStats::default();

    for record in records {
        stats.considered += 1;

        if record.captured_at > cutoff {
            stats.after_cutoff += 1;
            continue;
        }

        match winners.entry(partition.key_for(&record)) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                stats.superseded += 1;
                // Strictly newer only: ties keep the first-seen record.
                if record.captured_at > slot.get().captured_at {
                    slot.insert(record);
                }
            }
        }
    }

    tracing::debug!(
        cutoff_ms = cutoff.as_millis(),
        considered = stats.considered,
        after_cutoff = stats.after_cutoff,
        winners = winners.len(),
        "Reconciled snapshot records"
    );

    RecoverySet::new(winners, stats)
}
