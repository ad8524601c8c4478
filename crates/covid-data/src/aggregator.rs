//! Geographic roll-up of snapshot rows into the [`Store`].
//!
//! Every row is credited to the global, country, country+state and
//! country+state+county keys. When state or county is a wildcard some of
//! those keys coincide, and the row is credited once per *distinct* key.

use std::collections::BTreeSet;

use covid_core::models::RawRow;
use covid_core::store::Store;
use tracing::debug;

use crate::reader::Snapshot;

/// Stateless helper that folds snapshots into a [`Store`].
pub struct SnapshotAggregator;

impl SnapshotAggregator {
    /// Aggregate a sequence of snapshots. Each date's value is the sum over
    /// that snapshot's rows only; nothing carries across dates.
    pub fn aggregate(snapshots: &[Snapshot]) -> Store {
        let mut store = Store::new();
        for snapshot in snapshots {
            store.merge(Self::aggregate_snapshot(snapshot));
        }
        store
    }

    /// Local reduction of a single snapshot, suitable for merging.
    pub fn aggregate_snapshot(snapshot: &Snapshot) -> Store {
        let mut store = Store::new();
        Self::add_rows(&mut store, &snapshot.rows);
        debug!(
            "Aggregated {} rows for {} into {} locations",
            snapshot.rows.len(),
            snapshot.date,
            store.len()
        );
        store
    }

    /// Replace whatever `store` holds for the snapshot's date with the
    /// snapshot's totals. Ingesting the same file twice this way is idempotent.
    pub fn replace_snapshot(store: &mut Store, snapshot: &Snapshot) {
        store.reset_date(snapshot.date);
        store.merge(Self::aggregate_snapshot(snapshot));
    }

    /// Credit each row to every distinct roll-up key it belongs to.
    pub fn add_rows(store: &mut Store, rows: &[RawRow]) {
        for row in rows {
            let keys: BTreeSet<_> = row.candidate_keys().into_iter().collect();
            let counts = row.counts();
            for key in keys {
                store.add(key, row.date, counts);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
