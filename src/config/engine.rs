//! Engine concurrency settings

use serde::{Deserialize, Serialize};

/// Admission and worker-pool limits.
///
/// Defaults target the reference deployment: a 4-core / 4 GB single-node
/// host where one process serves HTTP and runs the model sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum simultaneous forward passes (admission gate capacity).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Blocking-pool threads for model loads and forward passes.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Task queue capacity.
    #[serde(default = "default_queue_max_size")]
    pub queue_max_size: usize,

    /// ONNX Runtime intra-op threads per session.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_worker_threads() -> usize {
    2
}

fn default_queue_max_size() -> usize {
    100
}

fn default_intra_threads() -> usize {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            worker_threads: default_worker_threads(),
            queue_max_size: default_queue_max_size(),
            intra_threads: default_intra_threads(),
        }
    }
}

impl EngineConfig {
    /// Blocking-pool size to build the runtime with. Never smaller than the
    /// admission capacity, otherwise the pool caps concurrency below the
    /// gate's configured ceiling.
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads.max(self.max_concurrent)
    }
}
