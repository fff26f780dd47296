//! Background media generation pipeline.
//!
//! The moving parts, from the outside in:
//!
//! - [`MediaPipeline`] — the facade the application holds. Fans requests in
//!   over a channel and answers status queries against the filesystem.
//! - [`PipelineRunner`] — a single-consumer event loop owning the pending
//!   queue and the worker pool, so admission decisions never race.
//! - [`WorkerPool`] — spawned generation tasks keyed by `(kind, item)`;
//!   the authoritative deduplication point.
//! - [`StatusTracker`] — the volatile status hint layered over the cache.
//!
//! The filesystem is the only durable state. Everything here can be thrown
//! away and rebuilt from the cache directory and the source roots.

mod limit;
mod pool;
mod progress;
mod queue;
mod runner;
mod service;
mod status;
mod task;

pub use limit::RenderGate;
pub use pool::WorkerPool;
pub use progress::{BatchProgress, BatchState, ProgressSnapshot};
pub use runner::{PipelineRunner, QueueEvent};
pub use service::{FrameSetReport, MediaPipeline};
pub use status::{MediaState, StatusRecord, StatusReport, StatusTracker};
pub use task::{run_generation, TaskOutcome, WorkerContext};
