//! Worker pool with per-key deduplication.
//!
//! The pool is the authoritative dedup point: a key with a live task is
//! rejected at submission, so a `(kind, item)` pair can never render twice
//! concurrently no matter how many times it is requested. Finished handles
//! are reaped on the runner's event loop, where task panics surface as log
//! lines instead of being dropped silently.

use crate::media::TaskKey;
use std::collections::HashMap;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Tracks the spawned generation tasks by key.
#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    handles: HashMap<TaskKey, JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            handles: HashMap::new(),
        }
    }

    /// Configured number of worker slots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks that are still running.
    pub fn active_count(&self) -> usize {
        self.handles.values().filter(|h| !h.is_finished()).count()
    }

    /// How many queue entries may be admitted right now. Never zero, so a
    /// saturated pool still drains the queue one entry per completion.
    pub fn admission_capacity(&self) -> usize {
        self.size.saturating_sub(self.active_count()).max(1)
    }

    /// Whether a live task exists for the key.
    pub fn has_live(&self, key: &TaskKey) -> bool {
        self.handles
            .get(key)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Spawns a task for the key unless one is already live.
    ///
    /// Returns `false` on a duplicate, leaving the running task untouched.
    pub fn submit<F>(&mut self, key: TaskKey, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.has_live(&key) {
            debug!(key = %key, "duplicate submission ignored, task already live");
            return false;
        }
        debug!(key = %key, "task submitted");
        self.handles.insert(key, tokio::spawn(task));
        true
    }

    /// Removes finished handles, awaiting each to surface panics.
    pub async fn reap_finished(&mut self) -> usize {
        let finished: Vec<TaskKey> = self
            .handles
            .iter()
            .filter(|(_, h)| h.is_finished())
            .map(|(k, _)| k.clone())
            .collect();

        for key in &finished {
            if let Some(handle) = self.handles.remove(key) {
                if let Err(err) = handle.await {
                    error!(key = %key, %err, "generation task panicked");
                }
            }
        }
        finished.len()
    }

    /// Waits for every live task to finish. Used on graceful shutdown.
    pub async fn drain(&mut self) {
        let count = self.handles.len();
        if count > 0 {
            debug!(tasks = count, "draining worker pool");
        }
        for (key, handle) in self.handles.drain() {
            if let Err(err) = handle.await {
                warn!(key = %key, %err, "task failed during drain");
            }
        }
    }

    /// Aborts everything that is still running.
    pub fn abort_all(&mut self) {
        for (key, handle) in self.handles.drain() {
            if !handle.is_finished() {
                warn!(key = %key, "aborting task");
                handle.abort();
            }
        }
    }
}
