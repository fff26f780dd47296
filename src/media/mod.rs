//! Core media types: item identifiers, media kinds, and task keys.
//!
//! A [`TaskKey`] — the pair of a [`MediaKind`] and an [`ItemId`] — identifies
//! one unit of generation work throughout the pipeline. It is the
//! deduplication key in the worker pool and the key of the status map.

mod layout;

pub use layout::CacheLayout;

use std::fmt;

/// Stable identifier for one catalogued volume.
///
/// Item ids are opaque strings, unique within a catalogue session, used as
/// the join key between session rows, source files, and cache entries.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an item id from the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string value of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which acquisition the frames of an interactive frame set come from.
///
/// Also selects the normalization curve: tilt-series slices keep a wider
/// dynamic range, tomogram slices get tighter contrast clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSource {
    TiltSeries,
    Tomogram,
}

impl FrameSource {
    /// Directory name for the exported frame set, under the item's cache dir.
    pub fn frames_dir_name(&self) -> &'static str {
        match self {
            FrameSource::TiltSeries => "frames_tiltseries",
            FrameSource::Tomogram => "frames_tomogram",
        }
    }
}

/// Category of derived artifact for one item.
///
/// The kind determines which source path category applies, which render
/// function runs, and the fixed cache file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Small grid thumbnail rendered from the reconstruction (`thumbnail.jpg`).
    Thumbnail,
    /// Low-magnification overview image (`lowmag.jpg`).
    Lowmag,
    /// Tilt-series animation (`tiltseries.gif`).
    TiltSeries,
    /// Slice-through animation of the reconstruction (`tomogram.gif`).
    Tomogram,
    /// Numbered frame sequence for interactive scrubbing (`frames_<source>/`).
    Frames(FrameSource),
}

/// Which configured source root a media kind reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCategory {
    Lowmag,
    TiltSeries,
    Tomogram,
}

impl MediaKind {
    /// The kinds generated for every queued item (frame sets are produced
    /// only on explicit request).
    pub fn passive() -> [MediaKind; 4] {
        [
            MediaKind::Thumbnail,
            MediaKind::Lowmag,
            MediaKind::TiltSeries,
            MediaKind::Tomogram,
        ]
    }

    /// Fixed artifact name under the item's cache directory.
    ///
    /// For [`MediaKind::Frames`] this is a directory, not a file.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            MediaKind::Thumbnail => "thumbnail.jpg",
            MediaKind::Lowmag => "lowmag.jpg",
            MediaKind::TiltSeries => "tiltseries.gif",
            MediaKind::Tomogram => "tomogram.gif",
            MediaKind::Frames(source) => source.frames_dir_name(),
        }
    }

    /// The source path category this kind decodes from.
    ///
    /// Thumbnails render from the reconstruction, so they share the tomogram
    /// source root.
    pub fn source_category(&self) -> SourceCategory {
        match self {
            MediaKind::Lowmag => SourceCategory::Lowmag,
            MediaKind::TiltSeries | MediaKind::Frames(FrameSource::TiltSeries) => {
                SourceCategory::TiltSeries
            }
            MediaKind::Thumbnail
            | MediaKind::Tomogram
            | MediaKind::Frames(FrameSource::Tomogram) => SourceCategory::Tomogram,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Thumbnail => "thumbnail",
            MediaKind::Lowmag => "lowmag",
            MediaKind::TiltSeries => "tiltseries",
            MediaKind::Tomogram => "tomogram",
            MediaKind::Frames(FrameSource::TiltSeries) => "frames_tiltseries",
            MediaKind::Frames(FrameSource::Tomogram) => "frames_tomogram",
        };
        write!(f, "{name}")
    }
}

/// Composite key identifying one unit of generation work.
///
/// Submitting the same key while a prior instance is queued or running is a
/// no-op; a task is never duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub kind: MediaKind,
    pub item: ItemId,
}

impl TaskKey {
    pub fn new(kind: MediaKind, item: ItemId) -> Self {
        Self { kind, item }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names_match_cache_layout() {
        assert_eq!(MediaKind::Lowmag.artifact_name(), "lowmag.jpg");
        assert_eq!(MediaKind::TiltSeries.artifact_name(), "tiltseries.gif");
        assert_eq!(MediaKind::Tomogram.artifact_name(), "tomogram.gif");
        assert_eq!(MediaKind::Thumbnail.artifact_name(), "thumbnail.jpg");
        assert_eq!(
            MediaKind::Frames(FrameSource::Tomogram).artifact_name(),
            "frames_tomogram"
        );
    }

    #[test]
    fn test_thumbnail_reads_from_tomogram_root() {
        assert_eq!(
            MediaKind::Thumbnail.source_category(),
            SourceCategory::Tomogram
        );
    }

    #[test]
    fn test_task_key_display() {
        let key = TaskKey::new(MediaKind::Tomogram, ItemId::new("cell_01"));
        assert_eq!(key.to_string(), "tomogram/cell_01");
    }

    #[test]
    fn test_item_id_equality() {
        assert_eq!(ItemId::new("a"), ItemId::from("a"));
        assert_ne!(ItemId::new("a"), ItemId::new("b"));
    }
}
