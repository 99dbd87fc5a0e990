//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `GET|PUT|DELETE /values/:key` - Read, replace or purge a value
//! - `POST /values/:key/{flush,invalidate,lock,unlock,prefetch}` - Per-key control
//! - `POST /flush` - Write back every dirty value
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
