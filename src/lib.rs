//! Tomoshelf - preview generation for catalogued tomography volumes
//!
//! This library provides the media generation pipeline behind a tomography
//! catalogue: decoding large reconstruction volumes is slow (seconds per
//! volume), so previews are produced in the background, deduplicated per
//! `(media kind, item)` key, and cached on disk. The filesystem is the single
//! source of truth for "ready"; the in-memory status map is a volatile hint.
//!
//! # High-Level API
//!
//! The [`pipeline`] module provides the owning facade:
//!
//! ```ignore
//! use tomoshelf::media::{ItemId, MediaKind};
//! use tomoshelf::config::PipelineConfig;
//! use tomoshelf::pipeline::MediaPipeline;
//!
//! let mut config = PipelineConfig::new("/var/cache/tomoshelf");
//! config.sources.tomogram = Some("/data/reconstructions".into());
//!
//! let pipeline = MediaPipeline::start(config)?;
//! pipeline.enqueue(ItemId::new("cell_01"), true);
//!
//! // UI polls until the artifact lands on disk
//! let report = pipeline.get_status(MediaKind::Tomogram, &ItemId::new("cell_01"));
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      MediaPipeline                        │
//! │  enqueue / batch_enqueue / get_status / get_cache_path   │
//! ├──────────────────────────────────────────────────────────┤
//! │                      PipelineRunner                       │
//! │  single-consumer event loop: admit pending items when    │
//! │  the worker pool has spare capacity                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────┐  ┌────────────┐  ┌────────────────────┐  │
//! │  │ Pending    │  │ Worker     │  │ Status tracker     │  │
//! │  │ queue      │  │ pool       │  │ (fs wins)          │  │
//! │  └────────────┘  └────────────┘  └────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod render;
pub mod volume;

/// Version of the tomoshelf library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
