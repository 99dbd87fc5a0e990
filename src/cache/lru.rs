//! LRU Policy Module
//!
//! Implements Least Recently Used eviction that respects entry locks.

use std::collections::VecDeque;
use std::hash::Hash;

use crate::cache::{Entries, EvictionPolicy};

// == LRU Policy ==
/// Evicts the least recently used unlocked entry.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// When every entry is locked the least recently used one is evicted anyway.
#[derive(Debug)]
pub struct LruPolicy<K> {
    /// Order of keys by access time
    order: VecDeque<K>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl<K: PartialEq + Clone> LruPolicy<K> {
    // == Constructor ==
    /// Creates a policy that holds at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            order: VecDeque::new(),
            max_entries,
        }
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    fn touch(&mut self, key: &K) {
        self.forget(key);
        self.order.push_front(key.clone());
    }

    fn forget(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    #[cfg(test)]
    fn peek_oldest(&self) -> Option<&K> {
        self.order.back()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K, V> EvictionPolicy<K, V> for LruPolicy<K>
where
    K: Eq + Hash + Clone,
{
    fn is_full(&self, _key: &K, entries: &Entries<K, V>) -> bool {
        entries.len() >= self.max_entries
    }

    fn condemn(&mut self, _hint: &K, entries: &Entries<K, V>) -> Option<K> {
        let resident = self.order.iter().rev().filter(|k| entries.contains_key(*k));

        let mut fallback = None;
        for key in resident {
            if entries.get(key).is_some_and(|e| !e.is_locked()) {
                return Some(key.clone());
            }
            fallback.get_or_insert(key);
        }

        fallback
            .cloned()
            .or_else(|| entries.keys().next().cloned())
    }

    fn on_insert(&mut self, key: &K) {
        self.touch(key);
    }

    fn on_access(&mut self, key: &K) {
        self.touch(key);
    }

    fn on_remove(&mut self, key: &K) {
        self.forget(key);
    }
}
