//! Background removal service
//!
//! The inference engine's only in-process caller: preprocess an uploaded
//! image, run the segmentation model through the engine (which queues behind
//! the admission gate), postprocess the predicted mask into an alpha channel.

pub mod image_ops;

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use thiserror::Error;

use crate::config::CutoutConfig;
use crate::engine::{EngineError, InferenceEngine};

#[derive(Debug, Error)]
pub enum CutoutError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("model output unusable: {0}")]
    BadOutput(String),
}

/// Health payload for the cutout endpoint.
#[derive(Debug, Serialize)]
pub struct CutoutHealth {
    pub service: &'static str,
    pub model_loaded: bool,
    pub queue_size: usize,
}

pub struct CutoutService {
    engine: Arc<InferenceEngine>,
    model_id: String,
    target_size: u32,
}

impl CutoutService {
    pub fn new(engine: Arc<InferenceEngine>, config: &CutoutConfig) -> Self {
        Self {
            engine,
            model_id: config.model_path.to_string_lossy().into_owned(),
            target_size: config.target_size,
        }
    }

    /// Identifier the service resolves through the model registry.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Remove the background: returns the source image with the predicted
    /// mask applied as its alpha channel. Queues automatically while the
    /// engine is saturated.
    pub async fn process(&self, image: &DynamicImage) -> Result<RgbaImage, CutoutError> {
        let (width, height) = (image.width(), image.height());
        tracing::info!(width, height, "processing image");

        let input = image_ops::normalize_image(image, self.target_size);
        let output = self.engine.infer(&self.model_id, input).await?;
        let mask = image_ops::mask_from_output(&output, width, height)?;
        let composited = image_ops::apply_alpha_mask(image, &mask);

        tracing::info!("image processing completed");
        Ok(composited)
    }

    pub fn health(&self) -> CutoutHealth {
        CutoutHealth {
            service: "cutout",
            model_loaded: self
                .engine
                .loaded_models()
                .iter()
                .any(|m| m.id == self.model_id),
            queue_size: self.engine.queue_depth(),
        }
    }
}
