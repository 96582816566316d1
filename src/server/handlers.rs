//! HTTP request handlers

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Json, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use image::RgbaImage;
use serde::Serialize;

use crate::cutout::{CutoutError, CutoutService};
use crate::engine::{EngineError, InferenceEngine, LoadedModelInfo};
use crate::queue::TaskQueue;

/// Shared application state
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub cutout: Arc<CutoutService>,
    pub tasks: Arc<TaskQueue>,
}

impl AppState {
    pub fn new(
        engine: Arc<InferenceEngine>,
        cutout: Arc<CutoutService>,
        tasks: Arc<TaskQueue>,
    ) -> Self {
        Self {
            engine,
            cutout,
            tasks,
        }
    }
}

/// Liveness endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cutr",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Cutout service health: model residency plus free admission permits
pub async fn cutout_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.cutout.health())
}

/// Loaded models, observability only
pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ModelsResponse {
        models: state.engine.loaded_models(),
    })
}

/// Admission gate and task queue depth
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        permits_available: state.engine.queue_depth(),
        permits_capacity: state.engine.capacity(),
        task_queue_depth: state.tasks.size(),
        task_queue_capacity: state.tasks.capacity(),
        loaded_models: state.engine.loaded_models().len(),
    })
}

/// Background removal endpoint: multipart upload in, PNG attachment out.
pub async fn segment(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let (filename, bytes) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") || field.file_name().is_some() {
                    let filename = field.file_name().unwrap_or("image").to_string();
                    match field.bytes().await {
                        Ok(bytes) => break (filename, bytes),
                        Err(e) => {
                            return error_response(
                                StatusCode::BAD_REQUEST,
                                "invalid_request_error",
                                &format!("could not read upload: {e}"),
                            )
                        }
                    }
                }
            }
            Ok(None) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_request_error",
                    "no file field in form data",
                )
            }
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_request_error",
                    &format!("malformed multipart body: {e}"),
                )
            }
        }
    };

    if bytes.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "uploaded file is empty",
        );
    }

    let image = match image::load_from_memory(&bytes) {
        Ok(image) => image,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                &format!("could not decode image: {e}"),
            )
        }
    };

    match state.cutout.process(&image).await {
        Ok(output) => png_attachment(&filename, output),
        Err(e) => cutout_error_response(&e),
    }
}

/// Encode the composited image as a PNG download named `{stem}_no_bg.png`.
fn png_attachment(filename: &str, image: RgbaImage) -> Response {
    let mut buf = Vec::new();
    let encoded = image::DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png);
    if let Err(e) = encoded {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            &format!("could not encode result: {e}"),
        );
    }

    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&format!("{stem}_no_bg.png"))
    );

    (
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buf,
    )
        .into_response()
}

/// Load and computation failures map to distinct machine-readable kinds so
/// operators can tell a broken model asset from a failing input or a
/// saturated service.
fn cutout_error_response(err: &CutoutError) -> Response {
    let (status, kind) = match err {
        CutoutError::Engine(EngineError::ModelLoad { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "model_load_error")
        }
        CutoutError::Engine(EngineError::Inference { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "inference_error")
        }
        CutoutError::Engine(EngineError::ShuttingDown) => {
            (StatusCode::SERVICE_UNAVAILABLE, "shutting_down")
        }
        CutoutError::Decode(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        CutoutError::BadOutput(_) => (StatusCode::INTERNAL_SERVER_ERROR, "inference_error"),
    };
    error_response(status, kind, &err.to_string())
}

fn error_response(status: StatusCode, kind: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                message: message.to_string(),
                r#type: kind.to_string(),
            },
        }),
    )
        .into_response()
}

// Response types

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<LoadedModelInfo>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub permits_available: usize,
    pub permits_capacity: usize,
    pub task_queue_depth: usize,
    pub task_queue_capacity: usize,
    pub loaded_models: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}
