//! HTTP server for the cutout service
//!
//! Thin marshaling layer over the engine and domain services: routing,
//! multipart decoding, PNG responses, CORS, request tracing.

mod handlers;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub use handlers::AppState;
pub use routes::api_routes;

/// Start the HTTP server; returns once the shutdown signal fires and
/// in-flight connections have drained.
pub async fn start(state: Arc<AppState>, config: ServerConfig) -> Result<()> {
    let mut app = Router::new().merge(api_routes());

    if config.cors_enabled {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<HeaderValue> = config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };
        app = app.layer(cors);
    }

    if config.request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    let app = app
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .with_state(state);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health - Liveness");
    tracing::info!("  POST /api/v1/cutout/segment - Remove image background");
    tracing::info!("  GET  /api/v1/cutout/health - Cutout service health");
    tracing::info!("  GET  /api/v1/models - Loaded models");
    tracing::info!("  GET  /api/v1/status - Admission and queue depth");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
