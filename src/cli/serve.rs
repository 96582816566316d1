//! HTTP server command

use std::sync::Arc;

use anyhow::Result;

use crate::config::CutrConfig;
use crate::cutout::CutoutService;
use crate::engine::{InferenceEngine, OrtBackend};
use crate::queue::TaskQueue;
use crate::server::{self, AppState};

/// Start the cutout service.
///
/// Everything is constructed here, once, and handed down by reference:
/// backend → engine → domain service → app state. Teardown runs after the
/// server's graceful shutdown completes.
pub async fn serve(
    config: CutrConfig,
    port: Option<u16>,
    host: Option<String>,
    preload: bool,
) -> Result<()> {
    let mut server_config = config.server.clone();
    if let Some(port) = port {
        server_config.port = port;
    }
    if let Some(host) = host {
        server_config.host = host;
    }

    let backend = Arc::new(OrtBackend::new(config.engine.intra_threads));
    let engine = Arc::new(InferenceEngine::new(backend, &config.engine));
    let cutout = Arc::new(CutoutService::new(Arc::clone(&engine), &config.cutout));
    let tasks = Arc::new(TaskQueue::new(config.engine.queue_max_size));

    if preload {
        tracing::info!(model = cutout.model_id(), "pre-loading model");
        engine.preload(cutout.model_id()).await?;
        tracing::info!("model loaded");
    }

    let state = Arc::new(AppState::new(Arc::clone(&engine), cutout, Arc::clone(&tasks)));
    server::start(state, server_config).await?;

    tasks.close();
    engine.shutdown();

    Ok(())
}
