//! Write-back Cache - a generic write-back cache with pluggable sources and
//! eviction policies, plus an HTTP proxy over a directory of files.
//!
//! Values are read from a [`cache::Source`] on a miss, modified in memory and
//! written back when flushed, purged or evicted.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod source;
pub mod tasks;

pub use api::{create_router, with_cache, AppState, ServerCache, SharedCache};
pub use cache::{CacheEntry, CacheStats, EvictionPolicy, Source, WriteBackCache};
pub use config::Config;
pub use error::{CacheError, FailedWrite, SyncStep};
pub use tasks::spawn_flush_task;
