//! Location → date → counts store built during ingestion.
//!
//! Both levels are `BTreeMap`s so location listings and per-location dates
//! come out sorted without a separate pass.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{Counts, LocationKey};

/// Date-ordered counts for a single location.
pub type DatedCounts = BTreeMap<NaiveDate, Counts>;

/// Cumulative counts for every roll-up key observed during ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    locations: BTreeMap<LocationKey, DatedCounts>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-insert-zero the `(key, date)` slot and add `counts` to it.
    pub fn add(&mut self, key: LocationKey, date: NaiveDate, counts: Counts) {
        *self.locations.entry(key).or_default().entry(date).or_default() += counts;
    }

    /// Fold `other` into `self` by addition. Order of merges is irrelevant.
    pub fn merge(&mut self, other: Store) {
        for (key, dates) in other.locations {
            let slot = self.locations.entry(key).or_default();
            for (date, counts) in dates {
                *slot.entry(date).or_default() += counts;
            }
        }
    }

    /// Drop every location's entry for `date`, so that file can be ingested
    /// again without doubling its counts. Locations left empty are removed.
    pub fn reset_date(&mut self, date: NaiveDate) {
        self.locations.retain(|_, dates| {
            dates.remove(&date);
            !dates.is_empty()
        });
    }

    /// Dated counts for one location.
    pub fn get(&self, key: &LocationKey) -> Option<&DatedCounts> {
        self.locations.get(key)
    }

    pub fn contains(&self, key: &LocationKey) -> bool {
        self.locations.contains_key(key)
    }

    /// All location keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &LocationKey> {
        self.locations.keys()
    }

    /// All location keys as an owned, sorted list.
    pub fn keys_sorted(&self) -> Vec<LocationKey> {
        self.locations.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Most recent `(date, counts)` for `key` on or before `date`.
    pub fn latest_on_or_before(
        &self,
        key: &LocationKey,
        date: NaiveDate,
    ) -> Option<(NaiveDate, Counts)> {
        self.locations
            .get(key)?
            .range(..=date)
            .next_back()
            .map(|(d, c)| (*d, *c))
    }

    /// Replace zero cases/deaths with the previous date's value.
    ///
    /// Used for sources that report cases and deaths on separate date grids;
    /// the first date is never changed.
    pub fn fill_forward_zeros(&mut self, key: &LocationKey) {
        let Some(dates) = self.locations.get_mut(key) else {
            return;
        };
        let mut previous: Option<Counts> = None;
        for counts in dates.values_mut() {
            if let Some(prev) = previous {
                if counts.cases == 0 {
                    counts.cases = prev.cases;
                }
                if counts.deaths == 0 {
                    counts.deaths = prev.deaths;
                }
            }
            previous = Some(*counts);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
