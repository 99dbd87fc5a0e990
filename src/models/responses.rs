//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for `GET /values/:key`
#[derive(Debug, Clone, Serialize)]
pub struct ValueResponse {
    /// The requested key
    pub key: String,
    /// The cached value
    pub value: String,
}

impl ValueResponse {
    /// Creates a new ValueResponse
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for operations that only acknowledge a key
/// (put, purge, invalidate, lock, unlock, prefetch)
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Success message
    pub message: String,
    /// The key the operation applied to
    pub key: String,
}

impl MessageResponse {
    /// Creates a new MessageResponse, e.g. `MessageResponse::new("k", "purged")`
    pub fn new(key: impl Into<String>, action: &str) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' {}", key, action),
            key,
        }
    }
}

/// Response body for `POST /values/:key/flush`
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    /// The flushed key
    pub key: String,
    /// Whether a dirty value was written back
    pub written: bool,
}

/// Response body for `POST /flush`
#[derive(Debug, Clone, Serialize)]
pub struct FlushAllResponse {
    /// Number of values written back
    pub written: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Raw cache counters
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
