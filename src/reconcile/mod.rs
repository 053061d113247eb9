//! Merging freshly fetched records with the rows already stored in a tab.
//!
//! Everything in here is pure: no I/O, no errors. Bad input falls through a
//! filter predicate instead of aborting the batch.

pub mod auctions;
pub mod orders;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

pub use auctions::{mark_case_hits, reconcile, reconcile_at, ReconcileStats};
pub use orders::merge_orders;

/// Collapse `items` to one survivor per key, keeping the highest-ranked
/// entry. Groups keep first-seen order and ties go to the earliest entry.
pub(crate) fn keep_best_per_key<T, K, R>(
    items: Vec<T>,
    key: impl Fn(&T) -> K,
    rank: impl Fn(&T) -> R,
) -> Vec<T>
where
    K: Eq + Hash,
    R: Ord,
{
    let mut slots: HashMap<K, usize> = HashMap::with_capacity(items.len());
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match slots.entry(key(&item)) {
            Entry::Occupied(slot) => {
                let current = &mut kept[*slot.get()];
                if rank(&item) > rank(current) {
                    *current = item;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(item);
            }
        }
    }
    kept
}
