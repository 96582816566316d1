//! Admission gate
//!
//! Counting concurrency limiter in front of the shared compute sessions.
//! Callers beyond capacity park on the semaphore; permits are RAII guards,
//! so release happens on every exit path including panics.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::error::EngineError;

pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot. Suspends without polling while the gate is
    /// saturated; fails only after [`close`](Self::close).
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, EngineError> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::ShuttingDown)
    }

    /// Free slots right now. This is the gate's queue-depth probe.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the gate: wakes every waiter with an error and fails all
    /// subsequent `acquire` calls. Already-issued permits stay valid.
    pub fn close(&self) {
        self.permits.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn depth_tracks_outstanding_permits() {
        let gate = AdmissionGate::new(2);
        assert_eq!(gate.available(), 2);

        let p1 = gate.acquire().await.unwrap();
        let p2 = gate.acquire().await.unwrap();
        assert_eq!(gate.available(), 0);

        drop(p1);
        assert_eq!(gate.available(), 1);

        drop(p2);
        assert_eq!(gate.available(), 2);
        assert_eq!(gate.capacity(), 2);
    }

    #[tokio::test]
    async fn close_wakes_waiters_with_error() {
        let gate = Arc::new(AdmissionGate::new(1));
        let held = gate.acquire().await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };

        gate.close();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(EngineError::ShuttingDown)));

        // The permit issued before close is still a valid guard.
        drop(held);
        assert!(matches!(
            gate.acquire().await,
            Err(EngineError::ShuttingDown)
        ));
    }
}
