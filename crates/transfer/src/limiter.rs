use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};

/// Bounds the number of concurrently executing tasks.
///
/// The semaphore is private and never closed, so every admitted task holds
/// a permit for its whole run.
///
/// Admission is FIFO (tokio's semaphore is fair): a queued task starts as
/// soon as any running task finishes, whether it succeeded or failed.
/// Running tasks are never cancelled by the limiter.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimiter {
    /// Creates a limiter admitting `max` tasks at once (at least one).
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Waits for a free slot, then runs the task produced by `task`.
    ///
    /// `task` is only invoked once admitted, so nothing starts early.
    pub async fn schedule<F, Fut>(&self, task: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let _permit: SemaphorePermit<'_> = self
            .semaphore
            .acquire()
            .await
            .expect("limiter semaphore is never closed");
        task().await
    }

    /// Maximum number of concurrently running tasks.
    pub fn max_concurrency(&self) -> usize {
        self.max
    }

    /// Number of tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.max - self.semaphore.available_permits()
    }
}
