//! Cache Store Module
//!
//! The write-back cache engine: an associative store in front of a [`Source`],
//! with capacity and victim selection delegated to an [`EvictionPolicy`].

use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, error};

use crate::cache::{CacheEntry, CacheStats, Entries, EvictionPolicy, Source};
use crate::error::{CacheError, FailedWrite, Result, SyncStep};

// == Write-Back Cache ==
/// A fully-associative write-back cache.
///
/// Values are loaded from the source on first access and stay cached until
/// they are purged, invalidated or evicted. Modified values are only written
/// back when flushed or when their entry leaves the cache, never dropped
/// silently.
///
/// The engine does no internal locking. Share an instance between tasks by
/// wrapping it, e.g. in `Arc<Mutex<_>>`.
///
/// Dropping the cache runs [`clear`](Self::clear); failures are logged.
pub struct WriteBackCache<K, V, S, P>
where
    K: Eq + Hash + Clone + Debug,
    S: Source<K, V>,
    P: EvictionPolicy<K, V>,
{
    /// Resident entries
    entries: Entries<K, V>,
    /// Backing data source
    source: S,
    /// Capacity and victim selection
    policy: P,
    /// Activity counters
    stats: CacheStats,
}

impl<K, V, S, P> WriteBackCache<K, V, S, P>
where
    K: Eq + Hash + Clone + Debug,
    S: Source<K, V>,
    P: EvictionPolicy<K, V>,
{
    // == Constructor ==
    /// Creates an empty cache in front of `source`.
    pub fn new(source: S, policy: P) -> Self {
        Self {
            entries: Entries::new(),
            source,
            policy,
            stats: CacheStats::new(),
        }
    }

    // == Access ==
    /// Returns the value for `key`, loading it from the source if needed.
    ///
    /// Side effects: an absent key is read from the source and inserted,
    /// which may evict (and write back) another entry. With the `prefetch`
    /// feature, an outstanding prefetch for `key` is joined first.
    pub fn get(&mut self, key: &K) -> Result<&V, S::Error> {
        Ok(&self.resolve(key)?.value)
    }

    /// Mutable counterpart of [`get`](Self::get), with the same side effects.
    ///
    /// Changing the value does not mark it dirty; call
    /// [`mark_dirty`](Self::mark_dirty) for the change to reach the source.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V, S::Error> {
        Ok(&mut self.resolve(key)?.value)
    }

    // == Put ==
    /// Replaces the value for `key` and marks it dirty.
    ///
    /// An absent key is inserted directly without reading the source.
    pub fn put(&mut self, key: K, value: V) -> Result<(), S::Error> {
        if self.entries.contains_key(&key) {
            let entry = self.resolve(&key)?;
            entry.value = value;
            entry.mark_dirty();
        } else {
            let mut entry = CacheEntry::new(value);
            entry.mark_dirty();
            self.insert(&key, entry)?;
        }
        Ok(())
    }

    // == Lock ==
    /// Sets whether `key` should be evicted only after every unlocked entry.
    ///
    /// Locking is a preference for the eviction policy, not a guarantee.
    /// The entry is loaded first if it is not cached.
    pub fn lock(&mut self, key: &K, locked: bool) -> Result<(), S::Error> {
        self.resolve(key)?.locked = locked;
        Ok(())
    }

    // == Mark Dirty ==
    /// Flags the value for `key` to be written back to the source.
    ///
    /// The entry is loaded first if it is not cached.
    pub fn mark_dirty(&mut self, key: &K) -> Result<(), S::Error> {
        self.resolve(key)?.mark_dirty();
        Ok(())
    }

    // == Invalidate ==
    /// Drops the entry for `key` without writing it back.
    ///
    /// The next access reloads it from the source. Returns `Ok(false)` if the
    /// key was not cached.
    ///
    /// # Errors
    /// [`CacheError::DirtyInvalidate`] if the entry is dirty; the entry is
    /// left untouched. Flush it first.
    pub fn invalidate(&mut self, key: &K) -> Result<bool, S::Error> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(false);
        };
        if entry.dirty {
            return Err(CacheError::DirtyInvalidate(format!("{:?}", key)));
        }

        // An outstanding fetch still has to be joined exactly once
        #[cfg(feature = "prefetch")]
        self.synchronize(key).map_err(CacheError::Source)?;

        self.remove(key);
        self.stats.record_invalidation();
        debug!("Invalidated {:?}", key);
        Ok(true)
    }

    // == Flush ==
    /// Writes the value for `key` back if it is dirty. The entry stays cached.
    ///
    /// Returns `Ok(true)` if a write happened.
    pub fn flush(&mut self, key: &K) -> Result<bool, S::Error> {
        self.write_back(key).map_err(CacheError::Source)
    }

    /// Flushes every cached entry.
    ///
    /// Every entry is visited even if some writes fail; failed entries stay
    /// dirty and are reported together in [`CacheError::WriteBack`].
    /// Returns the number of values written.
    pub fn flush_all(&mut self) -> Result<usize, S::Error> {
        let dirty: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(key, _)| key.clone())
            .collect();

        let mut written = 0;
        let mut failures = Vec::new();
        for key in dirty {
            match self.write_back(&key) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(error) => failures.push(FailedWrite {
                    key: format!("{:?}", key),
                    step: SyncStep::Write,
                    error,
                }),
            }
        }

        batch_result(written, failures)
    }

    // == Purge ==
    /// Writes the entry for `key` back if dirty, then removes it.
    ///
    /// Returns `Ok(false)` if the key was not cached. If the write-back fails
    /// the entry stays cached and dirty.
    pub fn purge(&mut self, key: &K) -> Result<bool, S::Error> {
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        self.purge_resident(key).map_err(CacheError::Source)?;
        Ok(true)
    }

    /// Purges every entry.
    ///
    /// Every entry is visited even if some source calls fail. Failures are
    /// reported together in [`CacheError::WriteBack`], each tagged with its
    /// [`SyncStep`]: entries whose write-back failed remain cached and dirty,
    /// placeholders whose prefetch could not be joined are dropped.
    /// Returns the number of values written.
    pub fn clear(&mut self) -> Result<usize, S::Error> {
        let keys: Vec<K> = self.entries.keys().cloned().collect();

        let mut written = 0;
        let mut failures = Vec::new();
        for key in keys {
            #[cfg(feature = "prefetch")]
            if let Err(error) = self.synchronize(&key) {
                failures.push(FailedWrite {
                    key: format!("{:?}", key),
                    step: SyncStep::Join,
                    error,
                });
                continue;
            }

            match self.purge_resident(&key) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(error) => failures.push(FailedWrite {
                    key: format!("{:?}", key),
                    step: SyncStep::Write,
                    error,
                }),
            }
        }

        batch_result(written, failures)
    }

    // == Prefetch ==
    /// Starts loading `key` asynchronously.
    ///
    /// An absent key gets a placeholder entry (`V::default()`) and the source
    /// begins an asynchronous read; the next access joins it. Resident keys,
    /// including ones with a prefetch already pending, are left alone.
    #[cfg(feature = "prefetch")]
    pub fn prefetch(&mut self, key: &K) -> Result<(), S::Error>
    where
        V: Default,
    {
        if self.entries.contains_key(key) {
            return Ok(());
        }

        self.insert(key, CacheEntry::pending(V::default()))?;
        if let Err(err) = self.source.read_async(key) {
            self.remove(key);
            return Err(CacheError::Source(err));
        }

        self.stats.record_prefetch();
        debug!("Prefetching {:?}", key);
        Ok(())
    }

    // == Inspection ==
    /// Returns true if `key` is cached. Never loads.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the entry for `key` without loading or synchronizing it.
    pub fn peek(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the resident entries.
    pub fn entries(&self) -> &Entries<K, V> {
        &self.entries
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.dirty_entries = self.entries.values().filter(|e| e.dirty).count();
        stats
    }

    /// Returns the backing source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the backing source mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Returns the eviction policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    // == Internals ==

    // Resolve-or-load: every accessor goes through here.
    fn resolve(&mut self, key: &K) -> Result<&mut CacheEntry<V>, S::Error> {
        if self.entries.contains_key(key) {
            self.stats.record_hit();
            #[cfg(feature = "prefetch")]
            self.synchronize(key).map_err(CacheError::Source)?;
            self.policy.on_access(key);
        } else {
            self.stats.record_miss();
            let value = self.source.read(key).map_err(CacheError::Source)?;
            debug!("Loaded {:?} from source", key);
            self.insert(key, CacheEntry::new(value))?;
        }

        Ok(self
            .entries
            .get_mut(key)
            .expect("entry is resident after resolve"))
    }

    // Make room, then insert.
    fn insert(&mut self, key: &K, entry: CacheEntry<V>) -> Result<(), S::Error> {
        if self.policy.is_full(key, &self.entries) {
            let victim = self
                .policy
                .condemn(key, &self.entries)
                .ok_or(CacheError::EmptyStore)?;
            if !self.entries.contains_key(&victim) {
                return Err(CacheError::UnknownVictim(format!("{:?}", victim)));
            }

            debug!("Evicting {:?} to make room for {:?}", victim, key);
            self.purge_resident(&victim).map_err(CacheError::Source)?;
            self.stats.record_eviction();
        }

        self.entries.insert(key.clone(), entry);
        self.policy.on_insert(key);
        Ok(())
    }

    // Synchronize, write back if dirty, then erase. Returns whether a write happened.
    fn purge_resident(&mut self, key: &K) -> std::result::Result<bool, S::Error> {
        #[cfg(feature = "prefetch")]
        self.synchronize(key)?;

        let written = self.write_back(key)?;
        self.remove(key);
        Ok(written)
    }

    fn write_back(&mut self, key: &K) -> std::result::Result<bool, S::Error> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(false);
        };
        if !entry.dirty {
            return Ok(false);
        }

        self.source.write(key, &entry.value)?;
        entry.dirty = false;
        self.stats.record_write_back();
        debug!("Wrote {:?} back to source", key);
        Ok(true)
    }

    // Joins an outstanding prefetch. A failed join drops the placeholder.
    #[cfg(feature = "prefetch")]
    fn synchronize(&mut self, key: &K) -> std::result::Result<(), S::Error> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(());
        };
        if !entry.prefetched {
            return Ok(());
        }

        match self.source.wait_for_async_read(key) {
            Ok(value) => {
                entry.complete_fetch(value);
                Ok(())
            }
            Err(err) => {
                self.remove(key);
                Err(err)
            }
        }
    }

    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.policy.on_remove(key);
        }
        removed
    }
}

impl<K, V, S, P> Drop for WriteBackCache<K, V, S, P>
where
    K: Eq + Hash + Clone + Debug,
    S: Source<K, V>,
    P: EvictionPolicy<K, V>,
{
    fn drop(&mut self) {
        if let Err(err) = self.clear() {
            error!("Write-back while dropping cache failed: {}", err);
        }
    }
}

fn batch_result<E>(written: usize, failures: Vec<FailedWrite<E>>) -> Result<usize, E> {
    if failures.is_empty() {
        Ok(written)
    } else {
        Err(CacheError::WriteBack(failures))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FifoPolicy, LruPolicy};
    use crate::source::{MemorySource, MemorySourceError};

    type TestSource = MemorySource<&'static str, i32>;
    type TestCache<'a> =
        WriteBackCache<&'static str, i32, &'a mut TestSource, FifoPolicy<&'static str>>;

    fn cache(source: &mut TestSource, capacity: usize) -> TestCache<'_> {
        WriteBackCache::new(source, FifoPolicy::new(capacity))
    }

    #[test]
    fn test_access_loads_once() {
        let mut source = TestSource::with_data([("a", 1)]);
        {
            let mut cache = cache(&mut source, 10);

            assert_eq!(*cache.get(&"a").unwrap(), 1);
            assert_eq!(*cache.get(&"a").unwrap(), 1);

            let entry = cache.peek(&"a").unwrap();
            assert!(!entry.is_dirty());
            assert!(!entry.is_locked());
            assert_eq!(cache.source().reads(), &["a"]);

            let stats = cache.stats();
            assert_eq!(stats.misses, 1);
            assert_eq!(stats.hits, 1);
        }
        assert!(source.writes().is_empty());
    }

    #[test]
    fn test_absent_key_is_created_by_source() {
        let mut source = TestSource::new();
        {
            let mut cache = cache(&mut source, 10);
            assert_eq!(*cache.get(&"new").unwrap(), 0);
        }
        assert_eq!(source.value(&"new"), Some(&0));
    }

    #[test]
    fn test_get_mut_does_not_mark_dirty() {
        let mut source = TestSource::with_data([("a", 1)]);
        let mut cache = cache(&mut source, 10);

        *cache.get_mut(&"a").unwrap() = 5;
        assert!(!cache.peek(&"a").unwrap().is_dirty());
        assert_eq!(cache.flush(&"a").unwrap(), false);

        cache.mark_dirty(&"a").unwrap();
        assert_eq!(cache.flush(&"a").unwrap(), true);
        assert_eq!(cache.source().value(&"a"), Some(&5));
    }

    #[test]
    fn test_put_absent_key_skips_read() {
        let mut source = TestSource::new();
        let mut cache = cache(&mut source, 10);

        cache.put("a", 9).unwrap();
        assert!(cache.source().reads().is_empty());
        assert!(cache.peek(&"a").unwrap().is_dirty());
        assert_eq!(*cache.get(&"a").unwrap(), 9);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut source = TestSource::with_data([("a", 1)]);
        let mut cache = cache(&mut source, 10);

        assert_eq!(cache.flush(&"a").unwrap(), false);
        cache.put("a", 2).unwrap();
        assert_eq!(cache.flush(&"a").unwrap(), true);
        assert_eq!(cache.flush(&"a").unwrap(), false);

        assert_eq!(cache.source().writes(), &[("a", 2)]);
        assert!(cache.contains(&"a"));
    }

    #[test]
    fn test_flush_absent_is_noop() {
        let mut source = TestSource::new();
        let mut cache = cache(&mut source, 10);
        assert_eq!(cache.flush(&"missing").unwrap(), false);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_dirty_is_refused() {
        let mut source = TestSource::with_data([("a", 1)]);
        let mut cache = cache(&mut source, 10);

        cache.put("a", 2).unwrap();
        let result = cache.invalidate(&"a");
        assert!(matches!(result, Err(CacheError::DirtyInvalidate(_))));
        assert!(cache.peek(&"a").unwrap().is_dirty());

        cache.flush(&"a").unwrap();
        assert_eq!(cache.invalidate(&"a").unwrap(), true);
        assert!(!cache.contains(&"a"));
        assert_eq!(cache.invalidate(&"a").unwrap(), false);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let mut source = TestSource::with_data([("a", 1)]);
        let mut cache = cache(&mut source, 10);

        cache.get(&"a").unwrap();
        cache.invalidate(&"a").unwrap();
        cache.get(&"a").unwrap();
        assert_eq!(cache.source().reads(), &["a", "a"]);
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_purge_writes_back_then_removes() {
        let mut source = TestSource::new();
        let mut cache = cache(&mut source, 10);

        cache.put("a", 3).unwrap();
        assert_eq!(cache.purge(&"a").unwrap(), true);
        assert!(!cache.contains(&"a"));
        assert_eq!(cache.source().writes(), &[("a", 3)]);
        assert_eq!(cache.purge(&"a").unwrap(), false);
    }

    #[test]
    fn test_failed_purge_keeps_dirty_entry() {
        let mut source = TestSource::new();
        source.fail_writes("a");
        let mut cache = cache(&mut source, 10);

        cache.put("a", 3).unwrap();
        let result = cache.purge(&"a");
        assert!(matches!(
            result,
            Err(CacheError::Source(MemorySourceError::WriteRejected(_)))
        ));
        assert!(cache.peek(&"a").unwrap().is_dirty());

        cache.source_mut().allow_writes(&"a");
        assert!(cache.purge(&"a").unwrap());
    }

    #[test]
    fn test_capacity_two_eviction_writes_back_dirty_victim() {
        let mut source = TestSource::with_data([("A", 1), ("B", 2), ("C", 3)]);
        {
            let mut cache = cache(&mut source, 2);

            assert_eq!(*cache.get(&"A").unwrap(), 1);
            assert_eq!(*cache.get(&"B").unwrap(), 2);
            cache.mark_dirty(&"A").unwrap();
            assert_eq!(*cache.get(&"C").unwrap(), 3);

            assert_eq!(cache.len(), 2);
            assert!(cache.contains(&"C"));
            // Insertion order: A was first in
            assert!(!cache.contains(&"A"));
            assert!(cache.contains(&"B"));
            assert_eq!(cache.source().writes(), &[("A", 1)]);
            assert_eq!(cache.stats().evictions, 1);
        }
        assert_eq!(source.writes().len(), 1);
    }

    #[test]
    fn test_locked_entry_survives_repeated_eviction() {
        let mut source: MemorySource<i32, i32> = MemorySource::new();
        let mut cache = WriteBackCache::new(&mut source, LruPolicy::new(3));

        cache.lock(&0, true).unwrap();
        for key in 1..50 {
            cache.get(&key).unwrap();
            assert!(cache.contains(&0), "locked key evicted at {}", key);
            assert!(cache.len() <= 3);
        }

        cache.lock(&0, false).unwrap();
        cache.get(&100).unwrap();
        cache.get(&101).unwrap();
        cache.get(&102).unwrap();
        assert!(!cache.contains(&0));
    }

    #[test]
    fn test_all_locked_still_evicts_something() {
        let mut source = TestSource::new();
        let mut cache = cache(&mut source, 2);

        cache.lock(&"a", true).unwrap();
        cache.lock(&"b", true).unwrap();
        cache.get(&"c").unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn test_failed_eviction_aborts_insert() {
        let mut source = TestSource::new();
        source.fail_writes("a");
        let mut cache = cache(&mut source, 1);

        cache.put("a", 1).unwrap();
        let result = cache.get(&"b");
        assert!(matches!(result, Err(CacheError::Source(_))));
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.peek(&"a").unwrap().is_dirty());
    }

    #[test]
    fn test_zero_capacity_reports_empty_store() {
        let mut source = TestSource::new();
        let mut cache = cache(&mut source, 0);

        let result = cache.get(&"a");
        assert!(matches!(result, Err(CacheError::EmptyStore)));
    }

    /// Condemns a key that is never cached.
    struct GhostPolicy;

    impl EvictionPolicy<&'static str, i32> for GhostPolicy {
        fn is_full(&self, _key: &&'static str, entries: &Entries<&'static str, i32>) -> bool {
            !entries.is_empty()
        }

        fn condemn(
            &mut self,
            _hint: &&'static str,
            _entries: &Entries<&'static str, i32>,
        ) -> Option<&'static str> {
            Some("ghost")
        }
    }

    #[test]
    fn test_non_resident_victim_is_rejected() {
        let mut source = TestSource::with_data([("a", 1), ("b", 2)]);
        let mut cache = WriteBackCache::new(&mut source, GhostPolicy);

        cache.put("a", 5).unwrap();
        let result = cache.get(&"b");
        assert!(matches!(result, Err(CacheError::UnknownVictim(ref key)) if key == "\"ghost\""));

        assert_eq!(cache.len(), 1);
        assert!(!cache.contains(&"b"));
        let entry = cache.peek(&"a").unwrap();
        assert!(entry.is_dirty());
        assert_eq!(*entry.value(), 5);
        assert!(cache.source().writes().is_empty());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_clear_writes_only_dirty_entries() {
        let mut source = TestSource::with_data([("clean", 1), ("dirty", 2)]);
        {
            let mut cache = cache(&mut source, 10);
            cache.get(&"clean").unwrap();
            cache.mark_dirty(&"dirty").unwrap();

            assert_eq!(cache.clear().unwrap(), 1);
            assert!(cache.is_empty());
        }
        assert_eq!(source.writes(), &[("dirty", 2)]);
    }

    #[test]
    fn test_flush_all_reports_every_failure_and_keeps_going() {
        let mut source = TestSource::new();
        source.fail_writes("bad1");
        source.fail_writes("bad2");
        let mut cache = cache(&mut source, 10);

        cache.put("bad1", 1).unwrap();
        cache.put("good", 2).unwrap();
        cache.put("bad2", 3).unwrap();

        match cache.flush_all() {
            Err(CacheError::WriteBack(failures)) => {
                let mut keys: Vec<_> = failures.iter().map(|f| f.key.clone()).collect();
                keys.sort();
                assert_eq!(keys, vec!["\"bad1\"", "\"bad2\""]);
                assert!(failures.iter().all(|f| f.step == SyncStep::Write));
            }
            other => panic!("expected aggregated failure, got {:?}", other.map(|_| ())),
        }

        assert!(!cache.peek(&"good").unwrap().is_dirty());
        assert!(cache.peek(&"bad1").unwrap().is_dirty());
        assert_eq!(cache.stats().dirty_entries, 2);
    }

    #[test]
    fn test_clear_keeps_entries_whose_write_failed() {
        let mut source = TestSource::new();
        source.fail_writes("bad");
        let mut cache = cache(&mut source, 10);

        cache.put("bad", 1).unwrap();
        cache.put("good", 2).unwrap();

        assert!(matches!(cache.clear(), Err(CacheError::WriteBack(ref f)) if f.len() == 1));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"bad"));

        cache.source_mut().allow_writes(&"bad");
        assert_eq!(cache.clear().unwrap(), 1);
    }

    #[test]
    fn test_drop_writes_back_dirty_entries() {
        let mut source = TestSource::new();
        {
            let mut cache = cache(&mut source, 10);
            cache.put("a", 1).unwrap();
            cache.put("b", 2).unwrap();
        }
        let mut writes = source.writes().to_vec();
        writes.sort();
        assert_eq!(writes, vec![("a", 1), ("b", 2)]);
    }

    #[cfg(feature = "prefetch")]
    mod prefetch {
        use super::*;

        #[test]
        fn test_prefetch_then_access_joins_fetch() {
            let mut source = TestSource::with_data([("a", 7)]);
            let mut cache = cache(&mut source, 10);

            cache.prefetch(&"a").unwrap();
            let entry = cache.peek(&"a").unwrap();
            assert!(entry.is_prefetched());
            assert_eq!(cache.source().pending_reads(), 1);

            assert_eq!(*cache.get(&"a").unwrap(), 7);
            assert!(!cache.peek(&"a").unwrap().is_prefetched());
            assert_eq!(cache.source().pending_reads(), 0);
            assert!(cache.source().reads().is_empty());
            assert_eq!(cache.stats().prefetches, 1);
        }

        #[test]
        fn test_prefetch_is_noop_when_resident_or_pending() {
            let mut source = TestSource::with_data([("a", 1), ("b", 2)]);
            let mut cache = cache(&mut source, 10);

            cache.prefetch(&"a").unwrap();
            cache.prefetch(&"a").unwrap();
            assert_eq!(cache.source().async_reads(), &["a"]);

            cache.get(&"b").unwrap();
            cache.prefetch(&"b").unwrap();
            assert_eq!(cache.source().async_reads(), &["a"]);
        }

        #[test]
        fn test_mark_dirty_after_prefetch_synchronizes_first() {
            let mut source = TestSource::with_data([("a", 4)]);
            let mut cache = cache(&mut source, 10);

            cache.prefetch(&"a").unwrap();
            cache.mark_dirty(&"a").unwrap();

            let entry = cache.peek(&"a").unwrap();
            assert!(entry.is_dirty());
            assert!(!entry.is_prefetched());
            assert_eq!(*entry.value(), 4);
        }

        #[test]
        fn test_purge_joins_outstanding_prefetch() {
            let mut source = TestSource::with_data([("a", 4)]);
            let mut cache = cache(&mut source, 10);

            cache.prefetch(&"a").unwrap();
            assert!(cache.purge(&"a").unwrap());
            assert_eq!(cache.source().pending_reads(), 0);
            assert!(cache.source().writes().is_empty());
        }

        #[test]
        fn test_evicting_prefetched_entry_joins_it() {
            let mut source = TestSource::new();
            let mut cache = cache(&mut source, 1);

            cache.prefetch(&"a").unwrap();
            cache.get(&"b").unwrap();
            assert!(!cache.contains(&"a"));
            assert_eq!(cache.source().pending_reads(), 0);
        }

        #[test]
        fn test_failed_join_drops_placeholder() {
            let mut source = TestSource::with_data([("a", 4)]);
            let mut cache = cache(&mut source, 10);

            cache.prefetch(&"a").unwrap();
            // Join the read behind the cache's back so the cache's join fails
            cache.source_mut().wait_for_async_read(&"a").unwrap();

            assert!(matches!(
                cache.get(&"a"),
                Err(CacheError::Source(MemorySourceError::NotPending(_)))
            ));
            assert!(!cache.contains(&"a"));
            assert_eq!(*cache.get(&"a").unwrap(), 4);
        }

        #[test]
        fn test_clear_labels_failed_join() {
            let mut source = TestSource::with_data([("a", 4)]);
            let mut cache = cache(&mut source, 10);

            cache.prefetch(&"a").unwrap();
            cache.put("b", 2).unwrap();
            cache.source_mut().wait_for_async_read(&"a").unwrap();

            match cache.clear() {
                Err(CacheError::WriteBack(failures)) => {
                    assert_eq!(failures.len(), 1);
                    assert_eq!(failures[0].key, "\"a\"");
                    assert_eq!(failures[0].step, SyncStep::Join);
                }
                other => panic!("expected a join failure, got {:?}", other.map(|_| ())),
            }

            // The placeholder held no data and is gone; b was written
            assert!(cache.is_empty());
            assert_eq!(cache.source().writes(), &[("b", 2)]);
        }

        #[test]
        fn test_clear_joins_every_prefetch() {
            let mut source = TestSource::new();
            let mut cache = cache(&mut source, 10);

            cache.prefetch(&"a").unwrap();
            cache.prefetch(&"b").unwrap();
            assert_eq!(cache.clear().unwrap(), 0);
            assert_eq!(cache.source().pending_reads(), 0);
        }
    }
}
