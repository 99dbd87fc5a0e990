//! Age Policy Module
//!
//! Age-based eviction: every access ages all other entries by one and resets
//! the accessed entry, the oldest unlocked entry goes first.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::{Entries, EvictionPolicy};

// == Age Policy ==
/// Evicts the unlocked entry that has gone the most accesses without use.
///
/// Each access costs O(n) in the number of cached entries. Ages saturate
/// instead of wrapping. Locks come from the entries themselves, never from
/// the age counter.
#[derive(Debug)]
pub struct AgePolicy<K> {
    /// Accesses since each key was last used
    ages: HashMap<K, u64>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl<K: Eq + Hash + Clone> AgePolicy<K> {
    /// Creates a policy that holds at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            ages: HashMap::new(),
            max_entries,
        }
    }

    /// Returns the age of `key`, if tracked.
    pub fn age(&self, key: &K) -> Option<u64> {
        self.ages.get(key).copied()
    }

    fn bump(&mut self, key: &K) {
        for age in self.ages.values_mut() {
            *age = age.saturating_add(1);
        }
        self.ages.insert(key.clone(), 0);
    }
}

impl<K, V> EvictionPolicy<K, V> for AgePolicy<K>
where
    K: Eq + Hash + Clone,
{
    fn is_full(&self, _key: &K, entries: &Entries<K, V>) -> bool {
        entries.len() >= self.max_entries
    }

    fn condemn(&mut self, _hint: &K, entries: &Entries<K, V>) -> Option<K> {
        let age_of = |key: &K| self.ages.get(key).copied().unwrap_or(u64::MAX);

        entries
            .iter()
            .filter(|(_, entry)| !entry.is_locked())
            .max_by_key(|(key, _)| age_of(*key))
            .or_else(|| entries.iter().max_by_key(|(key, _)| age_of(*key)))
            .map(|(key, _)| key.clone())
    }

    fn on_insert(&mut self, key: &K) {
        self.bump(key);
    }

    fn on_access(&mut self, key: &K) {
        self.bump(key);
    }

    fn on_remove(&mut self, key: &K) {
        self.ages.remove(key);
    }
}
