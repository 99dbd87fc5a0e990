//! FIFO Policy Module
//!
//! Evicts in insertion order, skipping locked entries.

use std::collections::VecDeque;
use std::hash::Hash;

use crate::cache::{Entries, EvictionPolicy};

// == FIFO Policy ==
/// Evicts the earliest inserted unlocked entry; accesses do not reorder.
///
/// When every entry is locked the earliest inserted one is evicted.
#[derive(Debug)]
pub struct FifoPolicy<K> {
    /// Keys in insertion order, oldest at the front
    queue: VecDeque<K>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl<K> FifoPolicy<K> {
    /// Creates a policy that holds at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_entries,
        }
    }
}

impl<K, V> EvictionPolicy<K, V> for FifoPolicy<K>
where
    K: Eq + Hash + Clone,
{
    fn is_full(&self, _key: &K, entries: &Entries<K, V>) -> bool {
        entries.len() >= self.max_entries
    }

    fn condemn(&mut self, _hint: &K, entries: &Entries<K, V>) -> Option<K> {
        self.queue
            .iter()
            .find(|k| entries.get(*k).is_some_and(|e| !e.is_locked()))
            .or_else(|| self.queue.iter().find(|k| entries.contains_key(*k)))
            .cloned()
            .or_else(|| entries.keys().next().cloned())
    }

    fn on_insert(&mut self, key: &K) {
        self.queue.retain(|k| k != key);
        self.queue.push_back(key.clone());
    }

    fn on_remove(&mut self, key: &K) {
        self.queue.retain(|k| k != key);
    }
}
