//! Configuration system for cutr
//!
//! One file (YAML or JSON) with three sections: engine concurrency limits,
//! cutout pipeline parameters, and HTTP server settings. Every field has a
//! default, so an absent file or empty document yields a working config.

mod cutout;
mod engine;
mod server;

pub use cutout::CutoutConfig;
pub use engine::EngineConfig;
pub use server::ServerConfig;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// cutr configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutrConfig {
    /// Admission gate, worker pool, and task queue limits
    #[serde(default)]
    pub engine: EngineConfig,

    /// Segmentation model and preprocessing
    #[serde(default)]
    pub cutout: CutoutConfig,

    /// HTTP server settings (only for `cutr serve`)
    #[serde(default)]
    pub server: ServerConfig,
}

impl CutrConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the effective configuration: an explicit path when given,
    /// else `./cutr.yaml` when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let fallback = Path::new("cutr.yaml");
                if fallback.exists() {
                    Self::from_path(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(path),
            _ => Self::from_yaml(path),
        }
    }
}
