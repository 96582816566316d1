//! CLI commands
//!
//! Serve the HTTP API, run a one-shot cutout, or list available models.

mod list;
mod run;
mod serve;

pub use list::list;
pub use run::run;
pub use serve::serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cutr - background removal service on a bounded-concurrency ONNX engine
#[derive(Parser)]
#[command(name = "cutr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON); defaults to ./cutr.yaml if present
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Load the segmentation model before accepting requests
        #[arg(long)]
        preload: bool,
    },

    /// Remove the background of a single image file
    Run {
        /// Input image (PNG or JPEG)
        input: PathBuf,

        /// Model path (overrides config)
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Output file (default: alongside the input as <name>_no_bg.png)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List ONNX models in the model directory
    List {
        /// Show detailed information
        #[arg(long, short)]
        verbose: bool,
    },
}
