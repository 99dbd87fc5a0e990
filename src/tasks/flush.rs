//! Periodic Write-back Task
//!
//! Background task that periodically writes dirty cache entries back to the source.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{with_cache, SharedCache};

/// Spawns a background task that periodically flushes dirty cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between flushes. Each flush runs on the blocking pool. Failed write-backs
/// are logged and retried on the next run, since the entries stay dirty.
///
/// # Arguments
/// * `cache` - shared reference to the server cache
/// * `flush_interval_secs` - Interval in seconds between flushes
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let state = AppState::from_config(&config)?;
/// let flush_handle = spawn_flush_task(state.cache.clone(), 5);
/// // Later, during shutdown:
/// flush_handle.abort();
/// ```
pub fn spawn_flush_task(cache: SharedCache, flush_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(flush_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting write-back task with interval of {} seconds",
            flush_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let result = with_cache(&cache, |cache_guard| Ok(cache_guard.flush_all()?)).await;

            match result {
                Ok(0) => debug!("Write-back: no dirty entries"),
                Ok(written) => info!("Write-back: flushed {} dirty entries", written),
                Err(err) => warn!("Write-back incomplete: {}", err),
            }
        }
    })
}
