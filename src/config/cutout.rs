//! Cutout pipeline settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Segmentation model and preprocessing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoutConfig {
    /// Path of the ONNX segmentation model; doubles as its registry id.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Side length the input is resized to before the forward pass.
    #[serde(default = "default_target_size")]
    pub target_size: u32,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("./data/models/model.onnx")
}

fn default_target_size() -> u32 {
    1024
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            target_size: default_target_size(),
        }
    }
}
