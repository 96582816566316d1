//! cutr - background removal service on a bounded-concurrency inference engine
//!
//! One expensive compute resource (an ONNX segmentation model) is shared by
//! many concurrent callers on a small single-node host. The engine keeps that
//! safe: lazy coalesced model loading, a counting admission gate, and offload
//! of every forward pass to a bounded blocking pool.
//!
//! # Architecture
//!
//! - **engine**: admission gate + model registry + session backend — the core
//! - **queue**: generic bounded priority task queue (same admission philosophy)
//! - **cutout**: the segmentation pipeline, the engine's only in-repo caller
//! - **server**: thin axum boundary (multipart in, PNG out, observability)
//! - **cli / config**: serve, one-shot run, model listing; file-based settings
//!
//! # Example
//!
//! ```bash
//! # Start the service
//! cutr serve --port 8000 --preload
//!
//! # One-shot cutout
//! cutr run photo.jpg --model ./data/models/model.onnx
//!
//! # List available models
//! cutr list
//! ```

pub mod cli;
pub mod config;
pub mod cutout;
pub mod engine;
pub mod queue;
pub mod server;

// Re-export key types
pub use config::{CutoutConfig, CutrConfig, EngineConfig, ServerConfig};
pub use engine::{EngineError, InferenceEngine, OrtBackend, Tensor};
pub use queue::{Task, TaskPriority, TaskQueue};
