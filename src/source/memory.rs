//! In-memory source
//!
//! A HashMap-backed [`Source`] that records every call made to it. Useful for
//! tests and for caching values that are expensive to rebuild but cheap to keep.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

use crate::cache::Source;

/// Failures reported by [`MemorySource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemorySourceError {
    /// Writes to this key were configured to fail
    #[error("Write rejected for key {0}")]
    WriteRejected(String),

    /// A join was requested without a matching asynchronous read
    #[error("No asynchronous read pending for key {0}")]
    NotPending(String),
}

// == Memory Source ==
/// HashMap-backed source with call logs and injectable write failures.
///
/// Reading an absent key creates it with `V::default()`. Asynchronous reads
/// are queued and resolved against the map when joined.
#[derive(Debug)]
pub struct MemorySource<K, V> {
    data: HashMap<K, V>,
    reads: Vec<K>,
    writes: Vec<(K, V)>,
    rejected: HashSet<K>,
    async_reads: Vec<K>,
    pending: HashSet<K>,
}

impl<K, V> Default for MemorySource<K, V> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
            reads: Vec::new(),
            writes: Vec::new(),
            rejected: HashSet::new(),
            async_reads: Vec::new(),
            pending: HashSet::new(),
        }
    }
}

impl<K, V> MemorySource<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default,
{
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source pre-populated with `data`.
    pub fn with_data(data: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            data: data.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Returns the stored value for `key`.
    pub fn value(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    /// Keys passed to synchronous `read`, in call order.
    pub fn reads(&self) -> &[K] {
        &self.reads
    }

    /// Successful writes, in call order.
    pub fn writes(&self) -> &[(K, V)] {
        &self.writes
    }

    /// Keys passed to `read_async`, in call order.
    pub fn async_reads(&self) -> &[K] {
        &self.async_reads
    }

    /// Number of asynchronous reads not joined yet.
    pub fn pending_reads(&self) -> usize {
        self.pending.len()
    }

    /// Makes every subsequent write of `key` fail.
    pub fn fail_writes(&mut self, key: impl Into<K>) {
        self.rejected.insert(key.into());
    }

    /// Undoes [`fail_writes`](Self::fail_writes).
    pub fn allow_writes(&mut self, key: &K) {
        self.rejected.remove(key);
    }

    fn fetch(&mut self, key: &K) -> V {
        self.data.entry(key.clone()).or_default().clone()
    }
}

impl<K, V> Source<K, V> for MemorySource<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default,
{
    type Error = MemorySourceError;

    fn read(&mut self, key: &K) -> Result<V, Self::Error> {
        self.reads.push(key.clone());
        Ok(self.fetch(key))
    }

    fn write(&mut self, key: &K, value: &V) -> Result<(), Self::Error> {
        if self.rejected.contains(key) {
            return Err(MemorySourceError::WriteRejected(format!("{:?}", key)));
        }
        self.data.insert(key.clone(), value.clone());
        self.writes.push((key.clone(), value.clone()));
        Ok(())
    }

    #[cfg(feature = "prefetch")]
    fn read_async(&mut self, key: &K) -> Result<(), Self::Error> {
        self.async_reads.push(key.clone());
        self.pending.insert(key.clone());
        Ok(())
    }

    #[cfg(feature = "prefetch")]
    fn wait_for_async_read(&mut self, key: &K) -> Result<V, Self::Error> {
        if !self.pending.remove(key) {
            return Err(MemorySourceError::NotPending(format!("{:?}", key)));
        }
        Ok(self.fetch(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_creates_missing_value() {
        let mut source: MemorySource<&str, u32> = MemorySource::new();
        assert_eq!(source.read(&"a").unwrap(), 0);
        assert_eq!(source.value(&"a"), Some(&0));
        assert_eq!(source.reads(), &["a"]);
    }

    #[test]
    fn test_rejected_write_leaves_data() {
        let mut source = MemorySource::with_data([("a", 1u32)]);
        source.fail_writes("a");

        assert!(matches!(
            source.write(&"a", &2),
            Err(MemorySourceError::WriteRejected(_))
        ));
        assert_eq!(source.value(&"a"), Some(&1));
        assert!(source.writes().is_empty());

        source.allow_writes(&"a");
        source.write(&"a", &2).unwrap();
        assert_eq!(source.value(&"a"), Some(&2));
    }

    #[cfg(feature = "prefetch")]
    #[test]
    fn test_async_read_joins_once() {
        let mut source = MemorySource::with_data([("a", 5u32)]);
        source.read_async(&"a").unwrap();
        assert_eq!(source.pending_reads(), 1);

        assert_eq!(source.wait_for_async_read(&"a").unwrap(), 5);
        assert!(matches!(
            source.wait_for_async_read(&"a"),
            Err(MemorySourceError::NotPending(_))
        ));
    }
}
