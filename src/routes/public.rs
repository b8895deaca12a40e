use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers and monitoring.
        .route("/health", get(|| async { "ok" }))
}
