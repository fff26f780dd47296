//! Pipeline configuration.
//!
//! [`PipelineConfig`] gathers everything the pipeline needs at startup: the
//! cache root, per-kind source roots, worker pool size, render settings, and
//! the retry/timeout policy. Source roots are supplied by the embedding
//! application; an unset root means "no source available" for that kind.
//!
//! [`SourcePaths`] can additionally be loaded from and saved to a JSON
//! settings file, so the catalogue UI can persist user-selected directories.

use crate::media::SourceCategory;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

// =============================================================================
// Defaults
// =============================================================================

/// Default number of worker slots for generation tasks.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Default cooldown before a key in `error` state may be retried.
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(30);

/// Default deadline for a single render before it is treated as failed.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Shorter side of grid thumbnails, in pixels.
pub const DEFAULT_THUMBNAIL_MIN_SIDE: u32 = 150;

/// Shorter side of overview images and animation frames, in pixels.
pub const DEFAULT_PREVIEW_MIN_SIDE: u32 = 384;

/// Animation playback rate.
pub const DEFAULT_ANIMATION_FPS: u16 = 10;

/// Frame caps per artifact flavor.
pub const DEFAULT_TILTSERIES_MAX_FRAMES: usize = 100;
pub const DEFAULT_TOMOGRAM_MAX_FRAMES: usize = 50;
pub const DEFAULT_EXPORT_MAX_FRAMES: usize = 200;

/// JPEG quality for stills and for exported frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
pub const DEFAULT_FRAME_JPEG_QUALITY: u8 = 90;

// =============================================================================
// Source paths
// =============================================================================

/// Errors loading or saving the source-path settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configured search roots for the three source categories.
///
/// `None` (or absent in the settings file) disables background generation
/// for the kinds that read from that category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcePaths {
    #[serde(default)]
    pub lowmag: Option<PathBuf>,

    #[serde(default)]
    pub tiltseries: Option<PathBuf>,

    #[serde(default)]
    pub tomogram: Option<PathBuf>,
}

impl SourcePaths {
    /// Returns the configured root for a source category, if any.
    pub fn root(&self, category: SourceCategory) -> Option<&Path> {
        match category {
            SourceCategory::Lowmag => self.lowmag.as_deref(),
            SourceCategory::TiltSeries => self.tiltseries.as_deref(),
            SourceCategory::Tomogram => self.tomogram.as_deref(),
        }
    }

    /// Loads source paths from a JSON settings file.
    ///
    /// A missing file yields the defaults (all roots unset) so a fresh
    /// install works without any setup step.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let paths: SourcePaths = serde_json::from_str(&raw)?;
        info!(path = %path.display(), "loaded source path settings");
        Ok(paths)
    }

    /// Saves source paths to a JSON settings file, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        info!(path = %path.display(), "saved source path settings");
        Ok(())
    }
}

// =============================================================================
// Render settings
// =============================================================================

/// Tunables for the decode/render stage.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Minimum pixel size of the shorter thumbnail side.
    pub thumbnail_min_side: u32,

    /// Minimum pixel size of the shorter side for overviews and animations.
    pub preview_min_side: u32,

    /// Animation frame rate.
    pub animation_fps: u16,

    /// Frame cap for tilt-series animations.
    pub tiltseries_max_frames: usize,

    /// Frame cap for tomogram slice animations.
    pub tomogram_max_frames: usize,

    /// Frame cap for interactive frame exports.
    pub export_max_frames: usize,

    /// JPEG quality for stills.
    pub jpeg_quality: u8,

    /// JPEG quality for exported frames (served individually, kept higher).
    pub frame_jpeg_quality: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            thumbnail_min_side: DEFAULT_THUMBNAIL_MIN_SIDE,
            preview_min_side: DEFAULT_PREVIEW_MIN_SIDE,
            animation_fps: DEFAULT_ANIMATION_FPS,
            tiltseries_max_frames: DEFAULT_TILTSERIES_MAX_FRAMES,
            tomogram_max_frames: DEFAULT_TOMOGRAM_MAX_FRAMES,
            export_max_frames: DEFAULT_EXPORT_MAX_FRAMES,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            frame_jpeg_quality: DEFAULT_FRAME_JPEG_QUALITY,
        }
    }
}

// =============================================================================
// Pipeline configuration
// =============================================================================

/// Full configuration for [`crate::pipeline::MediaPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrently running generation tasks.
    pub pool_size: usize,

    /// Root directory for cached artifacts.
    pub cache_dir: PathBuf,

    /// Per-category source search roots.
    pub sources: SourcePaths,

    /// Render tunables.
    pub render: RenderSettings,

    /// Cooldown before an `error` key may be regenerated.
    pub retry_cooldown: Duration,

    /// Deadline for a single render.
    pub render_timeout: Duration,
}

impl PipelineConfig {
    /// Creates a configuration with defaults and the given cache root.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            cache_dir: cache_dir.into(),
            sources: SourcePaths::default(),
            render: RenderSettings::default(),
            retry_cooldown: DEFAULT_RETRY_COOLDOWN,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("/cache");
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert!(config.sources.lowmag.is_none());
        assert_eq!(config.render.thumbnail_min_side, 150);
        assert_eq!(config.render.tomogram_max_frames, 50);
    }

    #[test]
    fn test_source_paths_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("settings").join("sources.json");

        let mut paths = SourcePaths::default();
        paths.tomogram = Some(PathBuf::from("/data/recs"));
        paths.save(&file).unwrap();

        let loaded = SourcePaths::load(&file).unwrap();
        assert_eq!(loaded.tomogram.as_deref(), Some(Path::new("/data/recs")));
        assert!(loaded.lowmag.is_none());
    }

    #[test]
    fn test_missing_settings_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let loaded = SourcePaths::load(&tmp.path().join("nope.json")).unwrap();
        assert!(loaded.tomogram.is_none());
    }

    #[test]
    fn test_root_lookup_by_category() {
        let mut paths = SourcePaths::default();
        paths.tiltseries = Some(PathBuf::from("/data/ts"));
        assert_eq!(
            paths.root(SourceCategory::TiltSeries),
            Some(Path::new("/data/ts"))
        );
        assert!(paths.root(SourceCategory::Lowmag).is_none());
    }
}
