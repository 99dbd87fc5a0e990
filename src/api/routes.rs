//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[cfg(feature = "prefetch")]
use super::handlers::prefetch_handler;
use super::handlers::{
    flush_all_handler, flush_handler, get_handler, health_handler, invalidate_handler,
    lock_handler, purge_handler, put_handler, stats_handler, unlock_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /values/:key` - Read a value, loading it on a miss
/// - `PUT /values/:key` - Replace a value (written back later)
/// - `DELETE /values/:key` - Write back and drop a value
/// - `POST /values/:key/flush` - Write back one value
/// - `POST /values/:key/invalidate` - Drop a clean value
/// - `POST /values/:key/lock`, `POST /values/:key/unlock` - Pin against eviction
/// - `POST /values/:key/prefetch` - Start a background read
/// - `POST /flush` - Write back every dirty value
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route(
            "/values/:key",
            get(get_handler).put(put_handler).delete(purge_handler),
        )
        .route("/values/:key/flush", post(flush_handler))
        .route("/values/:key/invalidate", post(invalidate_handler))
        .route("/values/:key/lock", post(lock_handler))
        .route("/values/:key/unlock", post(unlock_handler));

    #[cfg(feature = "prefetch")]
    let router = router.route("/values/:key/prefetch", post(prefetch_handler));

    router
        .route("/flush", post(flush_all_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
