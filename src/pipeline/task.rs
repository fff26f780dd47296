//! Generation task execution.
//!
//! `run_generation` is the blocking body of one task: resolve the source
//! file, decode, render, persist. `execute` wraps it for the pool — it takes
//! a render slot from the gate, runs the body on the blocking thread pool
//! under the render deadline, maps the outcome onto the status tracker,
//! cleans up partial output on failure, and reports completion back to the
//! runner so the next pending work is admitted.

use super::limit::RenderGate;
use super::status::StatusTracker;
use crate::config::RenderSettings;
use crate::error::MediaError;
use crate::locator::FileLocator;
use crate::media::{CacheLayout, MediaKind, TaskKey};
use crate::render::{export_frames, render_animation, render_still};
use crate::volume::read_volume;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Everything a generation task needs, shared across the pool.
#[derive(Debug)]
pub struct WorkerContext {
    pub layout: CacheLayout,
    pub locator: FileLocator,
    pub render: RenderSettings,
    pub gate: RenderGate,
}

/// What a finished task reports back to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub key: TaskKey,
    pub success: bool,
}

/// Produces the artifact for one key. Blocking; run via `spawn_blocking`.
pub fn run_generation(ctx: &WorkerContext, key: &TaskKey) -> Result<(), MediaError> {
    let source = ctx
        .locator
        .find_source(key.kind.source_category(), &key.item)
        .ok_or_else(|| MediaError::SourceMissing(key.to_string()))?;

    fs::create_dir_all(ctx.layout.item_dir(&key.item))?;
    let target = ctx.layout.artifact_path(key.kind, &key.item);

    match key.kind {
        MediaKind::Thumbnail => render_still(
            &source,
            &target,
            ctx.render.thumbnail_min_side,
            ctx.render.jpeg_quality,
        ),
        MediaKind::Lowmag => render_still(
            &source,
            &target,
            ctx.render.preview_min_side,
            ctx.render.jpeg_quality,
        ),
        MediaKind::TiltSeries | MediaKind::Tomogram => {
            let volume = read_volume(&source)?;
            let flavor = match key.kind {
                MediaKind::TiltSeries => crate::media::FrameSource::TiltSeries,
                _ => crate::media::FrameSource::Tomogram,
            };
            render_animation(&volume, &target, flavor, &ctx.render)
        }
        MediaKind::Frames(flavor) => {
            let volume = read_volume(&source)?;
            export_frames(&volume, &target, flavor, &ctx.render).map(|_| ())
        }
    }
}

/// Async wrapper scheduled on the worker pool for one key.
///
/// The blocking render runs under `deadline`. A blocking thread cannot be
/// interrupted, so on timeout the key is marked `error` and the completion
/// is reported immediately — but this task stays alive (keeping the key
/// live in the pool and the render slot occupied) until the straggler
/// thread exits, at which point its output is discarded. A key can
/// therefore never have two renders running at once, deadline or not.
pub async fn execute(
    ctx: Arc<WorkerContext>,
    status: Arc<StatusTracker>,
    key: TaskKey,
    deadline: Duration,
    completions: mpsc::UnboundedSender<TaskOutcome>,
) {
    let Ok(permit) = ctx.gate.acquire().await else {
        return;
    };

    let mut render = {
        let ctx = ctx.clone();
        let task_key = key.clone();
        tokio::task::spawn_blocking(move || run_generation(&ctx, &task_key))
    };

    let outcome = match tokio::time::timeout(deadline, &mut render).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(MediaError::Encode(format!("render panicked: {join_err}"))),
        Err(_) => {
            error!(key = %key, ?deadline, "render exceeded deadline");
            status.mark_error(&key);
            let _ = completions.send(TaskOutcome {
                key: key.clone(),
                success: false,
            });

            // Wait out the straggler, then throw away whatever it wrote
            let _ = render.await;
            if let Err(err) = ctx.layout.remove_artifact(key.kind, &key.item) {
                warn!(key = %key, %err, "failed to discard late render output");
            }
            drop(permit);
            return;
        }
    };
    drop(permit);

    let success = outcome.is_ok();
    match outcome {
        Ok(()) => {
            info!(key = %key, "artifact generated");
            status.mark_ready(&key);
        }
        Err(err) => {
            match &err {
                MediaError::SourceMissing(_) => warn!(key = %key, %err, "generation skipped"),
                _ => error!(key = %key, %err, "generation failed"),
            }
            if let Err(cleanup) = ctx.layout.remove_artifact(key.kind, &key.item) {
                warn!(key = %key, %cleanup, "failed to remove partial artifact");
            }
            status.mark_error(&key);
        }
    }

    // Runner may already be gone during shutdown
    let _ = completions.send(TaskOutcome { key, success });
}
