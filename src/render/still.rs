//! Still image rendering: thumbnails and low-magnification overviews.

use super::normalize::normalize_still;
use super::{persist_atomic, section_image, temp_path};
use crate::error::MediaError;
use crate::volume::read_volume;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// File extensions decoded through the volume reader rather than `image`.
const VOLUME_EXTENSIONS: &[&str] = &["mrc", "rec", "ali", "st"];

/// Extensions we cannot decode at all (proprietary microscope formats).
const UNSUPPORTED_EXTENSIONS: &[&str] = &["dm4"];

/// Renders a still JPEG from a source file.
///
/// Volume formats are decoded and their middle section is normalized to
/// 8-bit grayscale; plain image formats are decoded as-is. Either way the
/// output is resized so its shorter side is `min_side` and written atomically
/// as a JPEG with the given quality.
pub fn render_still(
    source: &Path,
    target: &Path,
    min_side: u32,
    quality: u8,
) -> Result<(), MediaError> {
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if UNSUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(MediaError::UnsupportedFormat(source.to_path_buf()));
    }

    let image = if VOLUME_EXTENSIONS.contains(&ext.as_str()) {
        let volume = read_volume(source)?;
        let pixels = normalize_still(volume.middle_section());
        let gray = section_image(pixels, volume.cols(), volume.rows(), min_side)?;
        DynamicImage::ImageLuma8(gray)
    } else {
        let decoded = image::open(source)?;
        let (w, h) = super::scaled_dimensions(decoded.width(), decoded.height(), min_side);
        decoded.resize_exact(w, h, FilterType::Lanczos3)
    };

    write_jpeg(&image, target, quality)?;
    debug!(source = %source.display(), target = %target.display(), "rendered still");
    Ok(())
}

/// Encodes to a temp file and renames into place.
fn write_jpeg(image: &DynamicImage, target: &Path, quality: u8) -> Result<(), MediaError> {
    let tmp = temp_path(target);
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        if let Err(err) = image.write_with_encoder(encoder) {
            drop(writer);
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
    }
    persist_atomic(&tmp, target)
}
