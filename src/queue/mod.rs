//! Generic bounded task queue
//!
//! Decouples producers from consumers for arbitrary asynchronous work,
//! applying the same admission-control philosophy as the inference engine:
//! a full queue pushes back on producers instead of growing without bound.
//!
//! Ordering is by priority, FIFO within a priority band. The queue is
//! in-memory only; work is lost on process restart.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Semaphore, TryAcquireError};
use uuid::Uuid;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Priority bands, lowest to highest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A unit of queued work. The queue treats the payload as opaque; `kind`
/// tells the consumer how to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique within the queue's lifetime; assigned at enqueue when `None`.
    #[serde(default)]
    pub id: Option<String>,
    pub kind: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Task {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            payload,
            priority: TaskPriority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is full ({capacity} tasks)")]
    Full { capacity: usize },

    #[error("queue is closed")]
    Closed,
}

struct QueuedTask {
    task: Task,
    seq: u64,
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority first, then earliest enqueued.
        self.task
            .priority
            .cmp(&other.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for QueuedTask {}

struct Inner {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

/// Bounded priority queue.
///
/// `slots` counts free capacity and is what producers park on; `items`
/// counts queued tasks and is what consumers park on. The heap itself is
/// only ever touched under the mutex, never across an await.
pub struct TaskQueue {
    inner: Mutex<Inner>,
    slots: Semaphore,
    items: Semaphore,
    capacity: usize,
    poll_interval: Duration,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
            capacity,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Bound the wait inside [`dequeue`](Self::dequeue).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Add a task, suspending while the queue is full (backpressure).
    /// Returns the task id, generating one if the task carries none.
    pub async fn enqueue(&self, task: Task) -> Result<String, QueueError> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| QueueError::Closed)?;
        permit.forget();
        Ok(self.push(task))
    }

    /// Non-blocking enqueue; fails with [`QueueError::Full`] at capacity.
    pub fn try_enqueue(&self, task: Task) -> Result<String, QueueError> {
        match self.slots.try_acquire() {
            Ok(permit) => {
                permit.forget();
                Ok(self.push(task))
            }
            Err(TryAcquireError::NoPermits) => Err(QueueError::Full {
                capacity: self.capacity,
            }),
            Err(TryAcquireError::Closed) => Err(QueueError::Closed),
        }
    }

    fn push(&self, mut task: Task) -> String {
        let id = task
            .id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();

        let size = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.heap.push(QueuedTask { task, seq });
            inner.heap.len()
        };
        self.items.add_permits(1);

        tracing::debug!(task = %id, size, "task enqueued");
        id
    }

    /// Remove and return the highest-priority task, waiting at most the poll
    /// interval. `None` means the queue stayed empty for the whole interval,
    /// letting consumer loops check for shutdown instead of parking forever.
    pub async fn dequeue(&self) -> Option<Task> {
        let permit = match tokio::time::timeout(self.poll_interval, self.items.acquire()).await {
            Ok(Ok(permit)) => permit,
            _ => return None,
        };
        permit.forget();

        let task = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            inner.heap.pop().map(|q| q.task)
        };

        match task {
            Some(task) => {
                self.slots.add_permits(1);
                if let Some(id) = task.id.as_deref() {
                    tracing::debug!(task = id, "task dequeued");
                }
                Some(task)
            }
            // A concurrent clear() raced the item permit.
            None => None,
        }
    }

    /// Queued, not-yet-dequeued tasks.
    pub fn size(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.heap.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every queued task without processing. Reset/test scenarios.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let drained = inner.heap.len();
        inner.heap.clear();

        for _ in 0..drained {
            match self.items.try_acquire() {
                Ok(permit) => permit.forget(),
                Err(_) => break,
            }
        }
        self.slots.add_permits(drained);

        if drained > 0 {
            tracing::debug!(drained, "queue cleared");
        }
    }

    /// Stop accepting tasks: blocked and future `enqueue` calls fail with
    /// [`QueueError::Closed`]. Tasks already queued still drain.
    pub fn close(&self) {
        self.slots.close();
    }
}
