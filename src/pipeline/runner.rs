//! The pipeline event loop.
//!
//! A single consumer owns the pending queue and the worker pool, so all
//! admission decisions are serialized: no lock juggling, no re-entrancy, no
//! double admission. Requests arrive as [`QueueEvent`]s over a channel;
//! completed tasks report back over a second channel, each completion
//! triggering another admission round so the queue drains as capacity frees
//! up.

use super::pool::WorkerPool;
use super::progress::BatchProgress;
use super::queue::{Pending, PendingQueue};
use super::status::StatusTracker;
use super::task::{self, TaskOutcome, WorkerContext};
use crate::media::{FrameSource, ItemId, MediaKind, TaskKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Requests from the facade to the runner.
#[derive(Debug)]
pub enum QueueEvent {
    /// Queue one item for passive media generation.
    Enqueue { item: ItemId, priority: bool },

    /// Queue a whole catalogue worth of items for background generation.
    Batch { items: Vec<ItemId> },

    /// Produce a frame set on demand. Always treated as priority work.
    Frames { source: FrameSource, item: ItemId },
}

/// Single-consumer scheduler: receives events, admits pending work into the
/// pool as capacity allows, reaps completed tasks.
pub struct PipelineRunner {
    ctx: Arc<WorkerContext>,
    status: Arc<StatusTracker>,
    progress: Arc<BatchProgress>,
    pending: PendingQueue,
    pool: WorkerPool,
    render_timeout: Duration,
    events: mpsc::UnboundedReceiver<QueueEvent>,
    completion_tx: mpsc::UnboundedSender<TaskOutcome>,
    completion_rx: mpsc::UnboundedReceiver<TaskOutcome>,
}

impl PipelineRunner {
    pub fn new(
        ctx: Arc<WorkerContext>,
        status: Arc<StatusTracker>,
        progress: Arc<BatchProgress>,
        pool_size: usize,
        render_timeout: Duration,
        events: mpsc::UnboundedReceiver<QueueEvent>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            ctx,
            status,
            progress,
            pending: PendingQueue::new(),
            pool: WorkerPool::new(pool_size),
            render_timeout,
            events,
            completion_tx,
            completion_rx,
        }
    }

    /// Runs until shutdown, abort, or every event sender is dropped.
    ///
    /// On graceful shutdown the pool is drained so in-flight renders finish
    /// and no half-written temp file is left to age in the cache. The abort
    /// token is the abrupt path: live tasks are cancelled, not awaited.
    pub async fn run(mut self, shutdown: CancellationToken, abort: CancellationToken) {
        info!(pool_size = self.pool.size(), "pipeline runner started");
        loop {
            tokio::select! {
                biased;

                _ = abort.cancelled() => {
                    info!(pending = self.pending.len(), "pipeline aborting");
                    self.pool.abort_all();
                    break;
                }

                _ = shutdown.cancelled() => {
                    info!(pending = self.pending.len(), "pipeline shutting down");
                    self.pool.drain().await;
                    break;
                }

                Some(outcome) = self.completion_rx.recv() => {
                    self.handle_completion(outcome).await;
                    self.admit();
                }

                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("all event senders dropped, pipeline stopping");
                        self.pool.drain().await;
                        break;
                    };
                    self.handle_event(event);
                    self.admit();
                }
            }
        }
        info!("pipeline runner stopped");
    }

    fn handle_event(&mut self, event: QueueEvent) {
        match event {
            QueueEvent::Enqueue { item, priority } => {
                let entry = Pending::Item {
                    item,
                    explicit: priority,
                };
                if priority {
                    self.pending.push_front(entry);
                } else {
                    self.pending.push_back(entry);
                }
            }
            QueueEvent::Batch { items } => {
                info!(items = items.len(), "batch enqueued");
                self.progress.begin(&items);
                for item in items {
                    self.pending.push_back(Pending::Item {
                        item,
                        explicit: false,
                    });
                }
            }
            QueueEvent::Frames { source, item } => {
                self.pending.push_front(Pending::Single {
                    key: TaskKey::new(MediaKind::Frames(source), item),
                });
            }
        }
    }

    async fn handle_completion(&mut self, outcome: TaskOutcome) {
        debug!(key = %outcome.key, success = outcome.success, "task completed");
        if outcome.success && outcome.key.kind == MediaKind::Thumbnail {
            self.progress
                .item_completed(&outcome.key.item, MediaKind::Thumbnail.artifact_name());
        }
        self.pool.reap_finished().await;
    }

    /// Moves pending entries into the pool, up to the admission capacity.
    fn admit(&mut self) {
        let capacity = self.pool.admission_capacity();
        for entry in self.pending.pop(capacity) {
            match entry {
                Pending::Item { item, explicit } => {
                    for kind in MediaKind::passive() {
                        self.spawn_task(TaskKey::new(kind, item.clone()), explicit);
                    }
                }
                Pending::Single { key } => {
                    self.spawn_task(key, true);
                }
            }
        }
    }

    /// Spawns one generation task unless it is redundant.
    ///
    /// Background (non-explicit) work skips kinds whose source root is
    /// unconfigured; explicit requests run anyway so the miss is surfaced
    /// as an error status rather than silence. A pre-existing artifact
    /// counts as a completion for batch accounting.
    fn spawn_task(&mut self, key: TaskKey, explicit: bool) {
        let configured = self
            .ctx
            .locator
            .root_configured(key.kind.source_category());
        if !configured && !explicit {
            debug!(key = %key, "skipping, source root unconfigured");
            return;
        }
        if self.ctx.layout.is_ready(key.kind, &key.item) {
            debug!(key = %key, "skipping, artifact already on disk");
            self.status.mark_ready(&key);
            if key.kind == MediaKind::Thumbnail {
                self.progress
                    .item_completed(&key.item, MediaKind::Thumbnail.artifact_name());
            }
            return;
        }
        if self.pool.has_live(&key) {
            return;
        }
        if self.status.in_error_cooldown(&key) {
            debug!(key = %key, "skipping, error cooldown active");
            return;
        }

        self.status.mark_generating(&key);
        let future = task::execute(
            self.ctx.clone(),
            self.status.clone(),
            key.clone(),
            self.render_timeout,
            self.completion_tx.clone(),
        );
        self.pool.submit(key, future);
    }
}
