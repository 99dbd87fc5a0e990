//! API Handlers
//!
//! HTTP request handlers mapping each endpoint onto one cache operation.
//! Cache operations touch the file system, so they run on the blocking pool.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::WriteBackCache;
use crate::config::{Config, DynPolicy};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    FlushAllResponse, FlushResponse, HealthResponse, MessageResponse, PutRequest, StatsResponse,
    ValueResponse,
};
use crate::source::{validate_key, FileSource};

/// The cache the server exposes: string values stored as files.
pub type ServerCache = WriteBackCache<String, String, FileSource, DynPolicy>;

/// The cache as shared between handlers and background tasks.
pub type SharedCache = Arc<Mutex<ServerCache>>;

/// Application state shared across all handlers.
///
/// The engine itself does no locking; every operation locks the mutex from
/// inside [`with_cache`].
#[derive(Clone)]
pub struct AppState {
    /// Shared write-back cache
    pub cache: SharedCache,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: ServerCache) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the data directory and builds the configured eviction policy.
    pub fn from_config(config: &Config) -> io::Result<Self> {
        let source = FileSource::new(&config.data_dir)?;
        let policy = config.eviction_policy.build(config.max_entries);
        Ok(Self::new(WriteBackCache::new(source, policy)))
    }
}

// == Blocking Access ==
/// Runs `op` against the cache on tokio's blocking thread pool.
///
/// Source reads, writes and prefetch joins are blocking file I/O, so the
/// mutex is taken inside the blocking task and never held by an async worker.
/// A poisoned mutex is recovered: the engine mutates an entry only after
/// the source call for it has returned.
pub async fn with_cache<T, F>(cache: &SharedCache, op: F) -> ApiResult<T>
where
    F: FnOnce(&mut ServerCache) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(cache);
    tokio::task::spawn_blocking(move || {
        let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut *guard)
    })
    .await?
}

fn checked(key: String) -> ApiResult<String> {
    match validate_key(&key) {
        Some(reason) => Err(ApiError::InvalidRequest(reason)),
        None => Ok(key),
    }
}

/// Handler for GET /values/:key
///
/// Returns the value, loading it from the data directory on a miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<ValueResponse>> {
    let key = checked(key)?;

    let response = with_cache(&state.cache, move |cache| {
        let value = cache.get(&key)?.clone();
        Ok(ValueResponse::new(key, value))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for PUT /values/:key
///
/// Replaces the value and marks it dirty; it reaches disk on the next flush.
pub async fn put_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<PutRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let key = checked(key)?;

    let response = with_cache(&state.cache, move |cache| {
        cache.put(key.clone(), req.value)?;
        Ok(MessageResponse::new(key, "stored"))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for DELETE /values/:key
///
/// Writes the value back if dirty and removes it from the cache.
pub async fn purge_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let key = checked(key)?;

    let response = with_cache(&state.cache, move |cache| {
        let action = if cache.purge(&key)? {
            "purged"
        } else {
            "was not cached"
        };
        Ok(MessageResponse::new(key, action))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /values/:key/flush
pub async fn flush_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<FlushResponse>> {
    let key = checked(key)?;

    let response = with_cache(&state.cache, move |cache| {
        let written = cache.flush(&key)?;
        Ok(FlushResponse { key, written })
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /values/:key/invalidate
///
/// Refused with 409 Conflict when the value is dirty.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let key = checked(key)?;

    let response = with_cache(&state.cache, move |cache| {
        let action = if cache.invalidate(&key)? {
            "invalidated"
        } else {
            "was not cached"
        };
        Ok(MessageResponse::new(key, action))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /values/:key/lock
pub async fn lock_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    set_lock(state, key, true).await
}

/// Handler for POST /values/:key/unlock
pub async fn unlock_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    set_lock(state, key, false).await
}

async fn set_lock(state: AppState, key: String, locked: bool) -> ApiResult<Json<MessageResponse>> {
    let key = checked(key)?;

    let response = with_cache(&state.cache, move |cache| {
        cache.lock(&key, locked)?;
        let action = if locked { "locked" } else { "unlocked" };
        Ok(MessageResponse::new(key, action))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /values/:key/prefetch
///
/// Starts reading the value in the background; the next access joins it.
#[cfg(feature = "prefetch")]
pub async fn prefetch_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let key = checked(key)?;

    let response = with_cache(&state.cache, move |cache| {
        cache.prefetch(&key)?;
        Ok(MessageResponse::new(key, "prefetching"))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /flush
///
/// Writes every dirty value back.
pub async fn flush_all_handler(State(state): State<AppState>) -> ApiResult<Json<FlushAllResponse>> {
    let written = with_cache(&state.cache, |cache| Ok(cache.flush_all()?)).await?;

    Ok(Json(FlushAllResponse { written }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = with_cache(&state.cache, |cache| Ok(cache.stats())).await?;

    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
