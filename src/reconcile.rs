//! Delta computation between what was already processed and what the
//! provider currently reports.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use crate::provider::{Highlight, Story};
use crate::store::DownloadedIds;

/// Anything the provider enumerates with a stable unique identifier.
pub trait Identified {
    fn unique_id(&self) -> &str;
}

impl Identified for Highlight {
    fn unique_id(&self) -> &str {
        &self.id
    }
}

impl Identified for Story {
    fn unique_id(&self) -> &str {
        &self.id
    }
}

/// The candidates whose id is not in `known`, in the provider's order.
///
/// This is the work list for a run: nothing outside it is downloaded or
/// logged. An id repeated within `candidates` is yielded only once.
pub fn new_items<T: Identified>(known: &DownloadedIds, candidates: Vec<T>) -> Vec<T> {
    let mut yielded: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .filter(|item| {
            let id = item.unique_id();
            !known.contains(id) && yielded.insert(id.to_string())
        })
        .collect()
}

/// Set difference in both directions between two listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChanges<T> {
    /// In `new` but not in `old`, in `new`'s order.
    pub added: Vec<T>,
    /// In `old` but not in `new`, in `old`'s order.
    pub removed: Vec<T>,
}

impl<T> ListChanges<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Diagnostic diff of two listings, logged at info level.
///
/// Purely for observability: the result never feeds back into persisted
/// state or into the download work list.
pub fn compare_and_log<T>(old: &[T], new: &[T], list_name: &str) -> ListChanges<T>
where
    T: Clone + Eq + Hash + Display,
{
    let old_set: HashSet<&T> = old.iter().collect();
    let new_set: HashSet<&T> = new.iter().collect();

    let mut added_seen = HashSet::new();
    let added: Vec<T> = new
        .iter()
        .filter(|item| !old_set.contains(item) && added_seen.insert(*item))
        .cloned()
        .collect();
    let mut removed_seen = HashSet::new();
    let removed: Vec<T> = old
        .iter()
        .filter(|item| !new_set.contains(item) && removed_seen.insert(*item))
        .cloned()
        .collect();

    if !added.is_empty() {
        tracing::info!("New {}: {}", list_name, join_display(&added));
    }
    if !removed.is_empty() {
        tracing::info!("Removed {}: {}", list_name, join_display(&removed));
    }

    ListChanges {
        added,
        removed,
    }
}

fn join_display<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of comparing the cached profile id with the provider's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileIdCheck {
    /// Nothing was cached yet.
    Missing { current: u64 },
    Unchanged { current: u64 },
    Changed { previous: u64, current: u64 },
}

impl ProfileIdCheck {
    /// Whether the cached id must be (re)written.
    pub fn needs_write(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }

    pub fn current(&self) -> u64 {
        match *self {
            Self::Missing { current }
            | Self::Unchanged { current }
            | Self::Changed { current, .. } => current,
        }
    }
}

pub fn reconcile_profile_id(cached: Option<u64>, remote: u64) -> ProfileIdCheck {
    match cached {
        None => ProfileIdCheck::Missing { current: remote },
        Some(previous) if previous == remote => ProfileIdCheck::Unchanged { current: remote },
        Some(previous) => ProfileIdCheck::Changed {
            previous,
            current: remote,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str);

    impl Identified for Item {
        fn unique_id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_new_items_keeps_unknown_in_order() {
        let known: DownloadedIds = ["b", "d"].into_iter().collect();
        let candidates = vec![Item("a"), Item("b"), Item("c"), Item("d"), Item("e")];
        let delta = new_items(&known, candidates);
        assert_eq!(delta, vec![Item("a"), Item("c"), Item("e")]);
    }

    #[test]
    fn test_new_items_empty_known_yields_all() {
        let delta = new_items(&DownloadedIds::new(), vec![Item("x"), Item("y")]);
        assert_eq!(delta, vec![Item("x"), Item("y")]);
    }

    #[test]
    fn test_new_items_all_known_yields_nothing() {
        let known: DownloadedIds = ["x", "y"].into_iter().collect();
        assert!(new_items(&known, vec![Item("y"), Item("x")]).is_empty());
    }

    #[test]
    fn test_new_items_collapses_repeated_candidates() {
        let delta = new_items(&DownloadedIds::new(), vec![Item("x"), Item("x"), Item("y")]);
        assert_eq!(delta, vec![Item("x"), Item("y")]);
    }

    #[test]
    fn test_new_items_exhaustive_small_sets() {
        // Every subset of a four-element universe as the known set.
        let universe = ["a", "b", "c", "d"];
        for mask in 0u8..16 {
            let known: DownloadedIds = universe
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1u8 << *i) != 0)
                .map(|(_, id)| *id)
                .collect();
            let candidates: Vec<Item> = universe.iter().rev().map(|id| Item(*id)).collect();
            let delta = new_items(&known, candidates.clone());

            let expected: Vec<Item> = candidates
                .into_iter()
                .filter(|item| !known.contains(item.0))
                .collect();
            assert_eq!(delta, expected, "mask {:04b}", mask);
        }
    }

    #[test]
    fn test_compare_and_log_both_directions() {
        let old = vec!["a", "b", "c"];
        let new = vec!["c", "d", "a", "e"];
        let changes = compare_and_log(&old, &new, "followers");
        assert_eq!(changes.added, vec!["d", "e"]);
        assert_eq!(changes.removed, vec!["b"]);
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_compare_and_log_identical() {
        let list = vec![1, 2, 3];
        assert!(compare_and_log(&list, &list, "ids").is_empty());
    }

    #[test]
    fn test_reconcile_profile_id() {
        assert_eq!(
            reconcile_profile_id(None, 5),
            ProfileIdCheck::Missing { current: 5 }
        );
        assert_eq!(
            reconcile_profile_id(Some(5), 5),
            ProfileIdCheck::Unchanged { current: 5 }
        );
        let changed = reconcile_profile_id(Some(4), 5);
        assert_eq!(
            changed,
            ProfileIdCheck::Changed {
                previous: 4,
                current: 5
            }
        );
        assert!(changed.needs_write());
        assert!(!reconcile_profile_id(Some(5), 5).needs_write());
        assert_eq!(changed.current(), 5);
    }
}
