//! The owning pipeline facade.
//!
//! [`MediaPipeline`] is what an embedding application holds: it owns the
//! runner task and exposes the request surface (enqueue, status, cache
//! paths, frame sets, progress). Status queries consult the filesystem
//! first — an artifact on disk is ready regardless of what the in-memory
//! map believes, and a ready record whose artifact has vanished heals
//! itself by queueing regeneration.

use super::limit::RenderGate;
use super::progress::{BatchProgress, ProgressSnapshot};
use super::runner::{PipelineRunner, QueueEvent};
use super::status::{MediaState, StatusReport, StatusTracker};
use super::task::WorkerContext;
use crate::config::PipelineConfig;
use crate::locator::FileLocator;
use crate::media::{CacheLayout, FrameSource, ItemId, MediaKind, TaskKey};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Status of a frame set plus the number of frames currently on disk.
#[derive(Debug, Clone, Copy)]
pub struct FrameSetReport {
    pub status: StatusReport,
    pub frame_count: usize,
}

/// Handle to a running media pipeline.
///
/// Call [`MediaPipeline::shutdown`] to stop gracefully, waiting for
/// in-flight renders to land in the cache. Dropping the handle instead is
/// the abrupt path: live tasks are aborted without blocking, and any
/// half-finished artifact is re-derived on the next run.
pub struct MediaPipeline {
    events: mpsc::UnboundedSender<QueueEvent>,
    status: Arc<StatusTracker>,
    layout: CacheLayout,
    progress: Arc<BatchProgress>,
    shutdown: CancellationToken,
    abort: CancellationToken,
    runner: Option<JoinHandle<()>>,
}

impl MediaPipeline {
    /// Creates the cache directory and starts the runner.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: PipelineConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.cache_dir)?;

        let layout = CacheLayout::new(&config.cache_dir);
        let ctx = Arc::new(WorkerContext {
            layout: layout.clone(),
            locator: FileLocator::new(config.sources),
            render: config.render,
            gate: RenderGate::new(config.pool_size),
        });
        let status = Arc::new(StatusTracker::new(config.retry_cooldown));
        let progress = Arc::new(BatchProgress::new());

        let (events, events_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let abort = CancellationToken::new();
        let runner = PipelineRunner::new(
            ctx,
            status.clone(),
            progress.clone(),
            config.pool_size,
            config.render_timeout,
            events_rx,
        );
        let handle = tokio::spawn(runner.run(shutdown.clone(), abort.clone()));

        info!(cache_dir = %config.cache_dir.display(), "media pipeline started");
        Ok(Self {
            events,
            status,
            layout,
            progress,
            shutdown,
            abort,
            runner: Some(handle),
        })
    }

    /// Queues one item for passive media generation. Priority requests jump
    /// the queue; re-requesting queued work promotes instead of duplicating.
    pub fn enqueue(&self, item: ItemId, priority: bool) {
        self.send(QueueEvent::Enqueue { item, priority });
    }

    /// Queues a list of items for background generation and starts progress
    /// tracking over the batch.
    pub fn batch_enqueue(&self, items: Vec<ItemId>) {
        self.send(QueueEvent::Batch { items });
    }

    /// Reports the state of `(kind, item)`, consulting the filesystem first.
    ///
    /// An unknown key is queued as priority work and reported as generating;
    /// a ready record whose artifact has disappeared is treated the same
    /// way. An error key stays `error` until the retry cooldown elapses,
    /// after which the next query requeues it.
    pub fn get_status(&self, kind: MediaKind, item: &ItemId) -> StatusReport {
        let key = TaskKey::new(kind, item.clone());

        if self.layout.is_ready(kind, item) {
            // Reload only on a watched generating -> ready transition; an
            // artifact first seen ready (restart, out-of-band copy) needs no
            // refresh because the caller never showed a placeholder for it.
            let was_generating = self
                .status
                .get(&key)
                .map(|r| r.state == MediaState::Generating)
                .unwrap_or(false);
            self.status.mark_ready(&key);
            return StatusReport {
                state: MediaState::Ready,
                reload: was_generating,
            };
        }

        match self.status.get(&key).map(|r| r.state) {
            Some(MediaState::Generating) => StatusReport {
                state: MediaState::Generating,
                reload: false,
            },
            Some(MediaState::Error) => {
                if self.status.in_error_cooldown(&key) {
                    StatusReport {
                        state: MediaState::Error,
                        reload: false,
                    }
                } else {
                    self.request(kind, item);
                    StatusReport {
                        state: MediaState::Generating,
                        reload: false,
                    }
                }
            }
            // Unknown, or a stale ready record with no artifact behind it
            _ => {
                self.request(kind, item);
                StatusReport {
                    state: MediaState::Generating,
                    reload: false,
                }
            }
        }
    }

    /// Path of the artifact if it is ready on disk.
    ///
    /// A miss queues generation as a side effect, so a caller that only ever
    /// asks for paths still gets the artifact eventually.
    pub fn get_cache_path(&self, kind: MediaKind, item: &ItemId) -> Option<PathBuf> {
        if self.layout.is_ready(kind, item) {
            return Some(self.layout.artifact_path(kind, item));
        }
        self.get_status(kind, item);
        None
    }

    /// Requests an on-demand frame set, reporting its state and how many
    /// frames are available so far.
    pub fn request_frames(&self, source: FrameSource, item: &ItemId) -> FrameSetReport {
        let status = self.get_status(MediaKind::Frames(source), item);
        let frame_count = match status.state {
            MediaState::Ready => self.layout.frame_count(source, item),
            _ => 0,
        };
        FrameSetReport {
            status,
            frame_count,
        }
    }

    /// Snapshot of the current batch walk.
    pub fn get_progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Stops accepting work and waits for in-flight renders to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.runner.take() {
            if let Err(err) = handle.await {
                warn!(%err, "pipeline runner ended abnormally");
            }
        }
    }

    fn request(&self, kind: MediaKind, item: &ItemId) {
        // Pre-mark so repeated polls see generating instead of re-queueing;
        // the queue deduplicates anyway.
        self.status
            .mark_generating(&TaskKey::new(kind, item.clone()));
        match kind {
            MediaKind::Frames(source) => self.send(QueueEvent::Frames {
                source,
                item: item.clone(),
            }),
            _ => self.send(QueueEvent::Enqueue {
                item: item.clone(),
                priority: true,
            }),
        }
    }

    fn send(&self, event: QueueEvent) {
        if self.events.send(event).is_err() {
            warn!("pipeline runner is gone, request dropped");
        }
    }
}

impl Drop for MediaPipeline {
    fn drop(&mut self) {
        // Non-blocking teardown: abort live tasks and let the runner exit.
        // After an explicit shutdown() the runner is already gone.
        if self.runner.is_some() {
            self.abort.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::mrc::HEADER_LEN;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_mrc(path: &Path, cols: i32, rows: i32, sections: i32) {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&cols.to_le_bytes());
        bytes[4..8].copy_from_slice(&rows.to_le_bytes());
        bytes[8..12].copy_from_slice(&sections.to_le_bytes());
        bytes[12..16].copy_from_slice(&2i32.to_le_bytes());
        bytes[208..212].copy_from_slice(b"MAP ");
        bytes[212] = 0x44;
        bytes[213] = 0x44;
        let count = (cols * rows * sections) as usize;
        for i in 0..count {
            bytes.extend_from_slice(&(i as f32).to_le_bytes());
        }
        fs::write(path, bytes).unwrap();
    }

    fn config(sources: &TempDir, cache: &TempDir) -> PipelineConfig {
        let mut config = PipelineConfig::new(cache.path());
        config.sources.tomogram = Some(sources.path().to_path_buf());
        config.render.thumbnail_min_side = 8;
        config.render.preview_min_side = 8;
        config
    }

    async fn wait_for_ready(pipeline: &MediaPipeline, kind: MediaKind, item: &ItemId) {
        for _ in 0..200 {
            if pipeline.get_status(kind, item).state == MediaState::Ready {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("{kind}/{item} never became ready");
    }

    #[tokio::test]
    async fn test_unknown_key_triggers_generation() {
        let sources = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        write_mrc(&sources.path().join("cell_01.mrc"), 16, 16, 4);

        let pipeline = MediaPipeline::start(config(&sources, &cache)).unwrap();
        let item = ItemId::new("cell_01");

        let first = pipeline.get_status(MediaKind::Tomogram, &item);
        assert_eq!(first.state, MediaState::Generating);

        wait_for_ready(&pipeline, MediaKind::Tomogram, &item).await;
        assert!(pipeline.get_cache_path(MediaKind::Tomogram, &item).is_some());
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_filesystem_wins_without_reload_for_unwatched_artifact() {
        let sources = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let pipeline = MediaPipeline::start(config(&sources, &cache)).unwrap();
        let item = ItemId::new("cell_01");

        // Artifact appears out of band, e.g. left over from a prior run.
        // Nothing watched it being generated, so no reload is needed.
        let path = cache.path().join("cell_01").join("tomogram.gif");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"gif bytes").unwrap();

        let first = pipeline.get_status(MediaKind::Tomogram, &item);
        assert_eq!(first.state, MediaState::Ready);
        assert!(!first.reload);

        let second = pipeline.get_status(MediaKind::Tomogram, &item);
        assert_eq!(second.state, MediaState::Ready);
        assert!(!second.reload);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_reload_flagged_once_on_generating_to_ready() {
        let sources = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let pipeline = MediaPipeline::start(config(&sources, &cache)).unwrap();
        let item = ItemId::new("cell_01");
        let key = TaskKey::new(MediaKind::Tomogram, item.clone());

        // A watched key: the caller saw it generating, then the artifact
        // lands. The first poll that observes it ready asks for a reload,
        // subsequent polls do not.
        pipeline.status.mark_generating(&key);
        let path = cache.path().join("cell_01").join("tomogram.gif");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"gif bytes").unwrap();

        let first = pipeline.get_status(MediaKind::Tomogram, &item);
        assert_eq!(first.state, MediaState::Ready);
        assert!(first.reload);

        let second = pipeline.get_status(MediaKind::Tomogram, &item);
        assert_eq!(second.state, MediaState::Ready);
        assert!(!second.reload);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_stale_ready_record_self_heals() {
        let sources = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        write_mrc(&sources.path().join("cell_01.mrc"), 16, 16, 4);

        let pipeline = MediaPipeline::start(config(&sources, &cache)).unwrap();
        let item = ItemId::new("cell_01");
        pipeline.get_status(MediaKind::Tomogram, &item);
        wait_for_ready(&pipeline, MediaKind::Tomogram, &item).await;

        // Cache wiped behind our back
        let path = pipeline
            .get_cache_path(MediaKind::Tomogram, &item)
            .unwrap();
        fs::remove_file(&path).unwrap();

        let report = pipeline.get_status(MediaKind::Tomogram, &item);
        assert_eq!(report.state, MediaState::Generating);
        wait_for_ready(&pipeline, MediaKind::Tomogram, &item).await;
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_source_reports_error_until_cooldown() {
        let sources = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let pipeline = MediaPipeline::start(config(&sources, &cache)).unwrap();
        let item = ItemId::new("ghost");

        assert_eq!(
            pipeline.get_status(MediaKind::Tomogram, &item).state,
            MediaState::Generating
        );

        for _ in 0..200 {
            if pipeline.get_status(MediaKind::Tomogram, &item).state == MediaState::Error {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(
            pipeline.get_status(MediaKind::Tomogram, &item).state,
            MediaState::Error
        );
        // A failed render must leave nothing behind in the cache
        assert!(!cache.path().join("ghost").exists());
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_frames_reports_count_when_ready() {
        let sources = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        write_mrc(&sources.path().join("cell_01.mrc"), 16, 16, 5);

        let pipeline = MediaPipeline::start(config(&sources, &cache)).unwrap();
        let item = ItemId::new("cell_01");

        let first = pipeline.request_frames(FrameSource::Tomogram, &item);
        assert_eq!(first.status.state, MediaState::Generating);
        assert_eq!(first.frame_count, 0);

        wait_for_ready(&pipeline, MediaKind::Frames(FrameSource::Tomogram), &item).await;
        let done = pipeline.request_frames(FrameSource::Tomogram, &item);
        assert_eq!(done.frame_count, 5);
        pipeline.shutdown().await;
    }
}
