//! Capability traits the cache engine is generic over.
//!
//! A cache instance is parameterised by a [`Source`], which it reads values
//! from and writes dirty values back to, and an [`EvictionPolicy`], which
//! decides when the cache is full and which resident key to drop.

use std::collections::HashMap;

use crate::cache::CacheEntry;

/// The associative store the engine exposes to eviction policies.
pub type Entries<K, V> = HashMap<K, CacheEntry<V>>;

// == Source ==
/// The keyed data source behind the cache.
pub trait Source<K, V> {
    /// Source-level failure, propagated verbatim to cache callers.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the value for `key`.
    ///
    /// If the source holds no value for `key` it must create one and return
    /// it. This is a creation operation, not fetch-or-fail.
    fn read(&mut self, key: &K) -> Result<V, Self::Error>;

    /// Writes a dirty value back.
    fn write(&mut self, key: &K, value: &V) -> Result<(), Self::Error>;

    /// Begins a non-blocking read of `key`.
    ///
    /// The default defers all work to [`wait_for_async_read`](Self::wait_for_async_read).
    #[cfg(feature = "prefetch")]
    fn read_async(&mut self, key: &K) -> Result<(), Self::Error> {
        let _ = key;
        Ok(())
    }

    /// Joins the read started by [`read_async`](Self::read_async) and returns its value.
    ///
    /// Called at most once per `read_async`. The default performs a blocking read.
    #[cfg(feature = "prefetch")]
    fn wait_for_async_read(&mut self, key: &K) -> Result<V, Self::Error> {
        self.read(key)
    }
}

impl<K, V, S> Source<K, V> for &mut S
where
    S: Source<K, V> + ?Sized,
{
    type Error = S::Error;

    fn read(&mut self, key: &K) -> Result<V, Self::Error> {
        (**self).read(key)
    }

    fn write(&mut self, key: &K, value: &V) -> Result<(), Self::Error> {
        (**self).write(key, value)
    }

    #[cfg(feature = "prefetch")]
    fn read_async(&mut self, key: &K) -> Result<(), Self::Error> {
        (**self).read_async(key)
    }

    #[cfg(feature = "prefetch")]
    fn wait_for_async_read(&mut self, key: &K) -> Result<V, Self::Error> {
        (**self).wait_for_async_read(key)
    }
}

// == Eviction Policy ==
/// Decides capacity and victims for a cache.
///
/// Locked entries rank strictly below unlocked ones: `condemn` must not return
/// a locked key while an unlocked one is resident. When every entry is locked
/// it must still return some resident key.
pub trait EvictionPolicy<K, V> {
    /// Returns true if `key` cannot be added without evicting something first.
    fn is_full(&self, key: &K, entries: &Entries<K, V>) -> bool;

    /// Picks the resident key to evict to make room for `hint`.
    ///
    /// Returns `None` only when `entries` is empty.
    fn condemn(&mut self, hint: &K, entries: &Entries<K, V>) -> Option<K>;

    /// Called after `key` has been added to the store.
    fn on_insert(&mut self, _key: &K) {}

    /// Called every time a resident `key` is resolved by an accessor.
    fn on_access(&mut self, _key: &K) {}

    /// Called after `key` has left the store.
    fn on_remove(&mut self, _key: &K) {}
}

impl<K, V, P> EvictionPolicy<K, V> for Box<P>
where
    P: EvictionPolicy<K, V> + ?Sized,
{
    fn is_full(&self, key: &K, entries: &Entries<K, V>) -> bool {
        (**self).is_full(key, entries)
    }

    fn condemn(&mut self, hint: &K, entries: &Entries<K, V>) -> Option<K> {
        (**self).condemn(hint, entries)
    }

    fn on_insert(&mut self, key: &K) {
        (**self).on_insert(key)
    }

    fn on_access(&mut self, key: &K) {
        (**self).on_access(key)
    }

    fn on_remove(&mut self, key: &K) {
        (**self).on_remove(key)
    }
}
