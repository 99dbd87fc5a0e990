//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for `PUT /values/:key`
///
/// The key comes from the path; the body carries the new value.
#[derive(Debug, Clone, Deserialize)]
pub struct PutRequest {
    /// The value to store
    pub value: String,
}
