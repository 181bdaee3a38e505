//! Set reconciliation of keyed child rows.

use inventory_types::UpsertSummary;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Whether rows absent from a report are kept or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Keep,
    Evict,
}

/// Match `incoming` against `existing` by key: update changed rows, insert
/// unseen keys and, with [`Missing::Evict`], delete keys not reported.
///
/// Rows that compare equal are left untouched and cost no write.
pub fn reconcile_set<K, V>(
    existing: &mut BTreeMap<K, V>,
    incoming: impl IntoIterator<Item = (K, V)>,
    missing: Missing,
) -> UpsertSummary
where
    K: Ord + Clone + std::fmt::Debug,
    V: PartialEq,
{
    let mut summary = UpsertSummary::default();
    let mut seen = BTreeSet::new();

    for (key, value) in incoming {
        seen.insert(key.clone());
        match existing.get_mut(&key) {
            Some(current) if *current == value => summary.unchanged += 1,
            Some(current) => {
                debug!("updating row {:?}", key);
                *current = value;
                summary.updated += 1;
            }
            None => {
                debug!("creating row {:?}", key);
                existing.insert(key, value);
                summary.created += 1;
            }
        }
    }

    if missing == Missing::Evict {
        let before = existing.len();
        existing.retain(|key, _| seen.contains(key));
        let evicted = before - existing.len();
        summary.deleted += u32::try_from(evicted).unwrap_or(u32::MAX);
    }

    summary
}
