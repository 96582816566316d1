//! Route definitions

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{cutout_health, health, list_models, segment, status, AppState};

/// Create the API router
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Liveness
        .route("/health", get(health))
        // Cutout endpoints
        .route("/api/v1/cutout/segment", post(segment))
        .route("/api/v1/cutout/health", get(cutout_health))
        // Observability
        .route("/api/v1/models", get(list_models))
        .route("/api/v1/status", get(status))
}
