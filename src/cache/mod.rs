//! Cache Module
//!
//! Provides the write-back cache engine, its capability traits and the
//! built-in eviction policies.

mod age;
mod entry;
mod fifo;
mod lru;
mod stats;
mod store;
mod traits;


// Re-export public types
pub use age::AgePolicy;
pub use entry::CacheEntry;
pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use stats::CacheStats;
pub use store::WriteBackCache;
pub use traits::{Entries, EvictionPolicy, Source};
