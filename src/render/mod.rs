//! Artifact rendering: stills, slice animations, and frame exports.
//!
//! Every renderer follows the same write discipline: encode into a sibling
//! `*.tmp` path, verify the result is non-empty, then rename into place.
//! Readers polling the cache therefore only ever observe absent or complete
//! artifacts, and a crashed render leaves at worst a stray temp file.

pub mod animation;
pub mod frames;
pub mod normalize;
pub mod still;

pub use animation::render_animation;
pub use frames::export_frames;
pub use still::render_still;

use crate::error::MediaError;
use image::imageops::FilterType;
use image::GrayImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Output dimensions such that the shorter side equals `min_side`, preserving
/// aspect ratio. Small inputs are scaled up.
pub(crate) fn scaled_dimensions(width: u32, height: u32, min_side: u32) -> (u32, u32) {
    let ratio = f64::max(
        min_side as f64 / width as f64,
        min_side as f64 / height as f64,
    );
    let out_w = ((width as f64 * ratio).round() as u32).max(1);
    let out_h = ((height as f64 * ratio).round() as u32).max(1);
    (out_w, out_h)
}

/// Builds a grayscale image from one normalized section and resizes it so the
/// shorter side is `min_side`.
pub(crate) fn section_image(
    pixels: Vec<u8>,
    cols: usize,
    rows: usize,
    min_side: u32,
) -> Result<GrayImage, MediaError> {
    let image = GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| MediaError::Encode("section pixel count mismatch".into()))?;
    let (w, h) = scaled_dimensions(cols as u32, rows as u32, min_side);
    Ok(image::imageops::resize(&image, w, h, FilterType::Lanczos3))
}

/// Sibling temp path used while an artifact is being written.
pub(crate) fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".tmp");
    target.with_file_name(name)
}

/// Moves a finished temp file into place, refusing to publish an empty one.
pub(crate) fn persist_atomic(tmp: &Path, target: &Path) -> Result<(), MediaError> {
    let len = fs::metadata(tmp).map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        if let Err(err) = fs::remove_file(tmp) {
            warn!(path = %tmp.display(), %err, "failed to remove empty temp file");
        }
        return Err(MediaError::Encode(format!(
            "encoder produced an empty file for {}",
            target.display()
        )));
    }
    fs::rename(tmp, target)?;
    Ok(())
}

/// Evenly spaced section indices, at most `max_frames` of them.
pub(crate) fn frame_indices(sections: usize, max_frames: usize) -> Vec<usize> {
    let stride = (sections / max_frames.max(1)).max(1);
    (0..sections).step_by(stride).collect()
}
