//! Bound on concurrently running renders.
//!
//! Queue admission is counted in queue entries, and one entry can expand to
//! several per-kind tasks. The gate is what actually holds the render
//! concurrency at the configured pool size: every task acquires a permit
//! before touching the blocking thread pool and holds it until its render
//! thread has exited.

use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Semaphore over the configured number of render slots.
#[derive(Debug, Clone)]
pub struct RenderGate {
    slots: Arc<Semaphore>,
}

impl RenderGate {
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Waits for a free render slot. The permit must be held for the whole
    /// lifetime of the render, including any straggler cleanup.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.slots.clone().acquire_owned().await
    }

    /// Render slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let gate = RenderGate::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2, "gate let more than 2 renders run");
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_is_clamped_to_one() {
        let gate = RenderGate::new(0);
        let permit = gate.acquire().await.unwrap();
        assert_eq!(gate.available(), 0);
        drop(permit);
        assert_eq!(gate.available(), 1);
    }
}
