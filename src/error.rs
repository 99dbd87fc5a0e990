//! Error types for the write-back cache
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Errors raised by [`WriteBackCache`](crate::cache::WriteBackCache) operations.
///
/// `E` is the error type of the backing source. Keys are rendered with their
/// `Debug` representation.
#[derive(Error, Debug)]
pub enum CacheError<E> {
    /// The backing source failed to read, write or join a prefetch
    #[error("Source error: {0}")]
    Source(#[source] E),

    /// The eviction policy asked for room but had nothing to condemn
    #[error("Eviction policy reported a full cache but the store is empty")]
    EmptyStore,

    /// The eviction policy condemned a key that is not cached
    #[error("Eviction policy condemned a key that is not cached: {0}")]
    UnknownVictim(String),

    /// Invalidating a dirty entry would lose data
    #[error("Refusing to invalidate dirty entry {0}; flush it first")]
    DirtyInvalidate(String),

    /// One or more entries failed to synchronize during `flush_all` or `clear`
    ///
    /// Each failure records whether the write-back or the join of an
    /// outstanding prefetch failed.
    #[error("{} entr(ies) failed to sync with the source: {}", .0.len(), FailedWrites(.0))]
    WriteBack(Vec<FailedWrite<E>>),
}

impl<E> CacheError<E> {
    /// Returns the source error if this is a single source failure.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            CacheError::Source(err) => Some(err),
            _ => None,
        }
    }
}

// == Failed Write ==
/// Which source call failed for an entry in a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Joining an outstanding prefetch; the placeholder was dropped
    Join,
    /// Writing a dirty value back; the entry stays cached and dirty
    Write,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStep::Join => f.write_str("prefetch join"),
            SyncStep::Write => f.write_str("write-back"),
        }
    }
}

/// A single entry that failed during `flush_all` or `clear`.
#[derive(Debug)]
pub struct FailedWrite<E> {
    /// Debug rendering of the key
    pub key: String,
    /// The source call that failed
    pub step: SyncStep,
    /// The source error
    pub error: E,
}

struct FailedWrites<'a, E>(&'a [FailedWrite<E>]);

impl<E: fmt::Display> fmt::Display for FailedWrites<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failed) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} ({}): {}", failed.key, failed.step, failed.error)?;
        }
        Ok(())
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T, E> = std::result::Result<T, CacheError<E>>;

// == API Error ==
/// Error type returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A cache operation failed
    #[error(transparent)]
    Cache(#[from] CacheError<io::Error>),

    /// The blocking task running a cache operation panicked or was cancelled
    #[error("Cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience Result type for HTTP handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Cache(CacheError::DirtyInvalidate(_)) => StatusCode::CONFLICT,
            ApiError::Cache(CacheError::Source(err))
                if err.kind() == io::ErrorKind::InvalidInput =>
            {
                StatusCode::BAD_REQUEST
            }
            ApiError::Cache(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}
