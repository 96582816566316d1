//! Bounded-concurrency inference engine
//!
//! This module is the core of the service:
//! - Gate: counting admission limiter in front of the compute sessions
//! - Registry: lazy, coalesced model loading keyed by identifier
//! - Session: the backend trait pair plus the ONNX Runtime implementation
//!
//! `InferenceEngine` composes the three: acquire a permit, resolve the model,
//! run the forward pass on the blocking pool, release the permit on every
//! exit path.

mod error;
mod gate;
mod registry;
mod session;

pub use error::EngineError;
pub use gate::AdmissionGate;
pub use registry::{LoadedModelInfo, ModelRegistry};
pub use session::{ModelSession, OrtBackend, SessionBackend, SessionError, Tensor};

use std::sync::Arc;

use crate::config::EngineConfig;

pub struct InferenceEngine {
    gate: AdmissionGate,
    registry: ModelRegistry,
}

impl InferenceEngine {
    /// Build an engine over the given backend. Constructed once at startup
    /// and shared by reference; there are no global instances.
    pub fn new(backend: Arc<dyn SessionBackend>, config: &EngineConfig) -> Self {
        tracing::info!(
            max_concurrent = config.max_concurrent,
            worker_threads = config.worker_threads,
            "inference engine initialized"
        );
        Self {
            gate: AdmissionGate::new(config.max_concurrent),
            registry: ModelRegistry::new(backend),
        }
    }

    /// Run one inference, queueing behind the admission gate when saturated.
    ///
    /// At most `max_concurrent` forward passes execute at any instant across
    /// all callers. There is no mid-flight cancellation: dropping the returned
    /// future abandons the await, but a forward pass already on the blocking
    /// pool runs to completion.
    pub async fn infer(&self, model_id: &str, input: Tensor) -> Result<Tensor, EngineError> {
        let _permit = self.gate.acquire().await?;

        let session = self.registry.get_or_load(model_id).await?;

        match tokio::task::spawn_blocking(move || session.run(input)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(EngineError::Inference {
                model: model_id.to_string(),
                source,
            }),
            Err(join) => Err(EngineError::Inference {
                model: model_id.to_string(),
                source: SessionError::Panicked(join.to_string()),
            }),
        }
    }

    /// Load a model ahead of its first use, outside the admission gate.
    pub async fn preload(&self, model_id: &str) -> Result<(), EngineError> {
        self.registry.get_or_load(model_id).await.map(|_| ())
    }

    /// Resident models. Observability only.
    pub fn loaded_models(&self) -> Vec<LoadedModelInfo> {
        self.registry.list_loaded()
    }

    /// Free admission permits. Observability only.
    pub fn queue_depth(&self) -> usize {
        self.gate.available()
    }

    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }

    /// Remove a resident model. No-op if absent.
    pub fn unload(&self, model_id: &str) -> bool {
        self.registry.unload(model_id)
    }

    /// Close the gate and drop every resident model. Waiting callers fail
    /// with [`EngineError::ShuttingDown`]; in-flight calls finish normally.
    pub fn shutdown(&self) {
        tracing::info!("shutting down inference engine");
        self.gate.close();
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;

    /// Session that sleeps while tracking how many callers are inside `run`
    /// simultaneously.
    struct BlockingSession {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        hold: Duration,
    }

    impl ModelSession for BlockingSession {
        fn run(&self, input: Tensor) -> Result<Tensor, SessionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.hold);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(input)
        }
    }

    struct BlockingBackend {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        hold: Duration,
    }

    impl SessionBackend for BlockingBackend {
        fn load(&self, _id: &str) -> Result<Box<dyn ModelSession>, SessionError> {
            Ok(Box::new(BlockingSession {
                in_flight: Arc::clone(&self.in_flight),
                peak: Arc::clone(&self.peak),
                hold: self.hold,
            }))
        }
    }

    struct FailingBackend;

    impl SessionBackend for FailingBackend {
        fn load(&self, id: &str) -> Result<Box<dyn ModelSession>, SessionError> {
            Err(SessionError::Other(format!("no such asset: {id}")))
        }
    }

    fn engine_config(max_concurrent: usize) -> EngineConfig {
        EngineConfig {
            max_concurrent,
            ..EngineConfig::default()
        }
    }

    fn input() -> Tensor {
        Tensor::new(vec![1], vec![0.0])
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_never_exceeds_gate_capacity() {
        let peak = Arc::new(AtomicUsize::new(0));
        let backend = Arc::new(BlockingBackend {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
            hold: Duration::from_millis(100),
        });
        let engine = Arc::new(InferenceEngine::new(backend, &engine_config(2)));

        let started = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.infer("m", input()).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 5 calls through 2 permits need at least 3 sequential batches.
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn load_failure_propagates_and_releases_permit() {
        let engine = InferenceEngine::new(Arc::new(FailingBackend), &engine_config(1));

        let err = engine.infer("ghost", input()).await.unwrap_err();
        assert!(matches!(err, EngineError::ModelLoad { .. }));

        // The permit came back despite the failure.
        assert_eq!(engine.queue_depth(), 1);
        assert!(engine.loaded_models().is_empty());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_calls() {
        let backend = Arc::new(BlockingBackend {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            hold: Duration::from_millis(1),
        });
        let engine = InferenceEngine::new(backend, &engine_config(2));

        engine.infer("m", input()).await.unwrap();
        engine.shutdown();

        let err = engine.infer("m", input()).await.unwrap_err();
        assert!(matches!(err, EngineError::ShuttingDown));
        assert!(engine.loaded_models().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn depth_reflects_load() {
        let backend = Arc::new(BlockingBackend {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            hold: Duration::from_millis(150),
        });
        let engine = Arc::new(InferenceEngine::new(backend, &engine_config(2)));
        assert_eq!(engine.queue_depth(), 2);

        let busy: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.infer("m", input()).await })
            })
            .collect();

        // Let both calls pass the gate.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.queue_depth(), 0);

        for handle in busy {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(engine.queue_depth(), 2);
    }
}
