//! One-shot cutout command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::CutrConfig;
use crate::cutout::CutoutService;
use crate::engine::{InferenceEngine, OrtBackend};

/// Remove the background of a single image file.
pub async fn run(
    mut config: CutrConfig,
    input: PathBuf,
    model: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    if let Some(model) = model {
        config.cutout.model_path = model;
    }

    let image = image::open(&input)
        .with_context(|| format!("could not open {}", input.display()))?;

    let backend = Arc::new(OrtBackend::new(config.engine.intra_threads));
    let engine = Arc::new(InferenceEngine::new(backend, &config.engine));
    let cutout = CutoutService::new(engine, &config.cutout);

    let result = cutout.process(&image).await?;

    let output = output.unwrap_or_else(|| default_output(&input));
    result
        .save(&output)
        .with_context(|| format!("could not write {}", output.display()))?;

    println!("Wrote {}", output.display());
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}_no_bg.png"))
}
