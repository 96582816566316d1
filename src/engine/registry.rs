//! Model registry
//!
//! Lazily materializes and caches model sessions keyed by identifier.
//! Concurrent first-access calls for the same id coalesce onto a single load
//! through a per-id once-cell; the load itself runs on the blocking pool.
//!
//! There is no eviction policy: resident models stay until `unload` or
//! process teardown, so memory grows with the number of distinct ids.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;

use super::error::EngineError;
use super::session::{ModelSession, SessionBackend, SessionError};

/// One resident model. The registry is the sole owner of the map entry;
/// callers get `Arc` clones of the session.
struct LoadedModel {
    session: Arc<dyn ModelSession>,
    loaded_at: DateTime<Utc>,
}

/// Identifier and load time of a resident model.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedModelInfo {
    pub id: String,
    pub loaded_at: DateTime<Utc>,
}

pub struct ModelRegistry {
    backend: Arc<dyn SessionBackend>,
    models: RwLock<HashMap<String, Arc<OnceCell<LoadedModel>>>>,
}

impl ModelRegistry {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session for `id`, loading it on first use.
    ///
    /// A resident id returns immediately. On a miss, exactly one load runs
    /// even under concurrent first access; the other callers wait on the same
    /// cell and receive clones of the resulting handle. A failed load leaves
    /// the id unresolved, so the next caller retries.
    pub async fn get_or_load(&self, id: &str) -> Result<Arc<dyn ModelSession>, EngineError> {
        let cell = {
            let mut models = self.models.write().unwrap_or_else(|p| p.into_inner());
            Arc::clone(models.entry(id.to_string()).or_default())
        };

        let loaded = cell.get_or_try_init(|| self.load(id)).await?;
        Ok(Arc::clone(&loaded.session))
    }

    async fn load(&self, id: &str) -> Result<LoadedModel, EngineError> {
        tracing::info!(model = id, "loading model");

        let backend = Arc::clone(&self.backend);
        let owned = id.to_string();
        let session = match tokio::task::spawn_blocking(move || backend.load(&owned)).await {
            Ok(Ok(session)) => session,
            Ok(Err(source)) => {
                return Err(EngineError::ModelLoad {
                    model: id.to_string(),
                    source,
                })
            }
            Err(join) => {
                return Err(EngineError::ModelLoad {
                    model: id.to_string(),
                    source: SessionError::Panicked(join.to_string()),
                })
            }
        };

        tracing::info!(model = id, "model loaded");
        Ok(LoadedModel {
            session: Arc::from(session),
            loaded_at: Utc::now(),
        })
    }

    /// Remove a resident model. Returns `false` (no-op) if the id is absent
    /// or still loading. Sessions already handed out stay usable; the
    /// registry does not reference-count them.
    pub fn unload(&self, id: &str) -> bool {
        let mut models = self.models.write().unwrap_or_else(|p| p.into_inner());
        match models.get(id) {
            Some(cell) if cell.initialized() => {
                models.remove(id);
                tracing::info!(model = id, "model unloaded");
                true
            }
            _ => false,
        }
    }

    /// Resident identifiers with their load timestamps. Observability only.
    pub fn list_loaded(&self) -> Vec<LoadedModelInfo> {
        let models = self.models.read().unwrap_or_else(|p| p.into_inner());
        models
            .iter()
            .filter_map(|(id, cell)| {
                cell.get().map(|loaded| LoadedModelInfo {
                    id: id.clone(),
                    loaded_at: loaded.loaded_at,
                })
            })
            .collect()
    }

    /// Drop every entry. Shutdown path.
    pub fn clear(&self) {
        let mut models = self.models.write().unwrap_or_else(|p| p.into_inner());
        let count = models.len();
        models.clear();
        if count > 0 {
            tracing::info!(count, "registry cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::session::Tensor;

    struct NullSession;

    impl ModelSession for NullSession {
        fn run(&self, input: Tensor) -> Result<Tensor, SessionError> {
            Ok(input)
        }
    }

    /// Counts how many loads actually execute.
    struct CountingBackend {
        loads: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                loads: AtomicUsize::new(0),
            })
        }
    }

    impl SessionBackend for CountingBackend {
        fn load(&self, _id: &str) -> Result<Box<dyn ModelSession>, SessionError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            // Widen the race window for concurrent first access.
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Box::new(NullSession))
        }
    }

    /// Fails the first load, succeeds afterwards.
    struct FlakyBackend {
        attempts: AtomicUsize,
    }

    impl SessionBackend for FlakyBackend {
        fn load(&self, _id: &str) -> Result<Box<dyn ModelSession>, SessionError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SessionError::Other("asset missing".to_string()))
            } else {
                Ok(Box::new(NullSession))
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_loads_once() {
        let backend = CountingBackend::new();
        let registry = Arc::new(ModelRegistry::new(backend.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_or_load("model-x").await.unwrap() })
            })
            .collect();

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }

        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        for session in &sessions[1..] {
            assert!(Arc::ptr_eq(&sessions[0], session));
        }
    }

    #[tokio::test]
    async fn unload_is_idempotent() {
        let registry = ModelRegistry::new(CountingBackend::new());

        assert!(!registry.unload("never-loaded"));

        registry.get_or_load("m").await.unwrap();
        assert_eq!(registry.list_loaded().len(), 1);

        assert!(registry.unload("m"));
        assert!(!registry.unload("m"));
        assert!(registry.list_loaded().is_empty());
    }

    #[tokio::test]
    async fn failed_load_leaves_id_absent_and_retries() {
        let registry = ModelRegistry::new(Arc::new(FlakyBackend {
            attempts: AtomicUsize::new(0),
        }));

        let err = registry.get_or_load("m").await.unwrap_err();
        assert!(matches!(err, EngineError::ModelLoad { .. }));
        assert!(registry.list_loaded().is_empty());

        registry.get_or_load("m").await.unwrap();
        assert_eq!(registry.list_loaded().len(), 1);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let registry = ModelRegistry::new(CountingBackend::new());
        registry.get_or_load("a").await.unwrap();
        registry.get_or_load("b").await.unwrap();
        assert_eq!(registry.list_loaded().len(), 2);

        registry.clear();
        assert!(registry.list_loaded().is_empty());
    }
}
