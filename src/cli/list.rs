//! List models command

use std::path::{Path, PathBuf};

use anyhow::Result;

/// List ONNX models in the model directory
pub async fn list(verbose: bool) -> Result<()> {
    let model_dir = std::env::var("CUTR_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./models"));

    if !model_dir.exists() {
        println!("No models directory found at: {}", model_dir.display());
        println!("\nSet CUTR_MODEL_DIR environment variable or create a ./models directory.");
        return Ok(());
    }

    println!("Models in {}:\n", model_dir.display());

    let mut found_any = false;

    for entry in std::fs::read_dir(&model_dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            found_any = true;

            if verbose {
                print_model_details(&path, &name);
            } else {
                println!("  {}", name);
            }
        }
    }

    if !found_any {
        println!("  No models found.");
        println!("\nPlace ONNX model files in {}", model_dir.display());
    }

    Ok(())
}

fn print_model_details(path: &Path, name: &str) {
    println!("  {}", name);
    println!("    Path: {}", path.display());

    if let Ok(metadata) = std::fs::metadata(path) {
        let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
        if size_mb > 1024.0 {
            println!("    Size: {:.2} GB", size_mb / 1024.0);
        } else {
            println!("    Size: {:.2} MB", size_mb);
        }
    }

    println!();
}
