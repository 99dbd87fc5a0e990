//! Cache Entry Module
//!
//! Defines the per-key record held by the write-back cache.

// == Cache Entry ==
/// A single cached value together with its synchronization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// The cached value
    pub(crate) value: V,
    /// Prefer other entries for eviction
    pub(crate) locked: bool,
    /// The value has diverged from the source and awaits write-back
    pub(crate) dirty: bool,
    /// An asynchronous fetch was issued and has not been joined yet
    #[cfg(feature = "prefetch")]
    pub(crate) prefetched: bool,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a synchronized, unlocked, clean entry.
    pub fn new(value: V) -> Self {
        Self {
            value,
            locked: false,
            dirty: false,
            #[cfg(feature = "prefetch")]
            prefetched: false,
        }
    }

    /// Creates a placeholder whose value will be filled in by a pending fetch.
    #[cfg(feature = "prefetch")]
    pub(crate) fn pending(placeholder: V) -> Self {
        Self {
            prefetched: true,
            ..Self::new(placeholder)
        }
    }

    // == Accessors ==
    /// Returns the cached value.
    ///
    /// For a prefetched entry this is the placeholder until the fetch is joined.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns true if the entry should be evicted after every unlocked entry.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns true if the value still has to be written back.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns true if an asynchronous fetch for this entry is still outstanding.
    #[cfg(feature = "prefetch")]
    pub fn is_prefetched(&self) -> bool {
        self.prefetched
    }

    // == Mark Dirty ==
    /// Flags the value for write-back.
    ///
    /// # Panics
    /// Panics if a prefetch is still outstanding: the value would be
    /// overwritten by the fetch when it is joined.
    pub(crate) fn mark_dirty(&mut self) {
        #[cfg(feature = "prefetch")]
        assert!(
            !self.prefetched,
            "cannot mark an entry dirty while its prefetch is outstanding"
        );
        self.dirty = true;
    }

    /// Stores the result of a joined fetch.
    #[cfg(feature = "prefetch")]
    pub(crate) fn complete_fetch(&mut self, value: V) {
        debug_assert!(!self.dirty, "prefetched entry cannot be dirty");
        self.value = value;
        self.prefetched = false;
    }
}
