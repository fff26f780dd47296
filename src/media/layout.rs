//! Cache directory layout and artifact readiness.
//!
//! One directory per item under the cache root, with fixed artifact names
//! per media kind:
//!
//! ```text
//! <cache_dir>/<item>/thumbnail.jpg
//! <cache_dir>/<item>/lowmag.jpg
//! <cache_dir>/<item>/tiltseries.gif
//! <cache_dir>/<item>/tomogram.gif
//! <cache_dir>/<item>/frames_tomogram/0.jpg, 1.jpg, …
//! ```
//!
//! Existence plus non-zero size on disk is the sole source of truth for
//! "ready"; the in-memory status map is only a hint. Readers must treat a
//! zero-byte file as not ready.

use super::{FrameSource, ItemId, MediaKind};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves cache paths and answers readiness queries against the filesystem.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    cache_dir: PathBuf,
}

impl CacheLayout {
    /// Creates a layout rooted at the given cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory holding all artifacts for one item.
    pub fn item_dir(&self, item: &ItemId) -> PathBuf {
        self.cache_dir.join(item.as_str())
    }

    /// Full path of the artifact for `(kind, item)`.
    ///
    /// For [`MediaKind::Frames`] this is the frame-set directory.
    pub fn artifact_path(&self, kind: MediaKind, item: &ItemId) -> PathBuf {
        self.item_dir(item).join(kind.artifact_name())
    }

    /// Whether the artifact exists on disk with usable content.
    ///
    /// Single files must be non-empty; a frame set must contain at least one
    /// non-empty frame file.
    pub fn is_ready(&self, kind: MediaKind, item: &ItemId) -> bool {
        let path = self.artifact_path(kind, item);
        match kind {
            MediaKind::Frames(_) => dir_has_content(&path),
            _ => file_has_content(&path),
        }
    }

    /// Number of frame files present for an exported frame set.
    pub fn frame_count(&self, source: FrameSource, item: &ItemId) -> usize {
        let dir = self.artifact_path(MediaKind::Frames(source), item);
        match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|e| e.path().is_file())
                .count(),
            Err(_) => 0,
        }
    }

    /// Removes whatever is on disk for `(kind, item)`.
    ///
    /// Used by failing tasks so partial output is never mistaken for ready.
    /// Missing artifacts are not an error.
    pub fn remove_artifact(&self, kind: MediaKind, item: &ItemId) -> std::io::Result<()> {
        let path = self.artifact_path(kind, item);
        if !path.exists() {
            return Ok(());
        }
        match kind {
            MediaKind::Frames(_) => fs::remove_dir_all(&path),
            _ => fs::remove_file(&path),
        }
    }
}

fn file_has_content(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

fn dir_has_content(path: &Path) -> bool {
    let Ok(entries) = fs::read_dir(path) else {
        return false;
    };
    entries
        .filter_map(Result::ok)
        .any(|e| file_has_content(&e.path()))
}
