//! Animated GIF rendering for tilt-series and tomogram slice previews.
//!
//! The frame set is rendered once, then encoded with the `image` crate's GIF
//! encoder. Some pathological frame sets trip that encoder, so a failed
//! encode falls back to the lower-level `gif` crate before giving up.

use super::normalize::normalize_for;
use super::{frame_indices, persist_atomic, section_image, temp_path};
use crate::config::RenderSettings;
use crate::error::MediaError;
use crate::media::FrameSource;
use crate::volume::Volume;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, GrayImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, warn};

/// Renders an animated slice-through GIF from a volume stack.
///
/// Sections are sampled evenly up to the per-flavor frame cap, normalized
/// with the flavor's percentile window, and resized to the preview size. A
/// single-section volume cannot animate and is rejected.
pub fn render_animation(
    volume: &Volume,
    target: &Path,
    source: FrameSource,
    settings: &RenderSettings,
) -> Result<(), MediaError> {
    if !volume.is_stack() {
        return Err(MediaError::Encode(
            "animation requires a volume with at least 2 sections".into(),
        ));
    }

    let max_frames = match source {
        FrameSource::TiltSeries => settings.tiltseries_max_frames,
        FrameSource::Tomogram => settings.tomogram_max_frames,
    };

    let mut frames = Vec::new();
    for index in frame_indices(volume.sections(), max_frames) {
        let pixels = normalize_for(source, volume.section(index));
        frames.push(section_image(
            pixels,
            volume.cols(),
            volume.rows(),
            settings.preview_min_side,
        )?);
    }
    debug!(
        target = %target.display(),
        sections = volume.sections(),
        frames = frames.len(),
        "encoding animation"
    );

    let tmp = temp_path(target);
    let result = encode_gif(&frames, &tmp, settings.animation_fps).or_else(|err| {
        warn!(target = %target.display(), %err, "primary GIF encoder failed, retrying with fallback");
        let _ = std::fs::remove_file(&tmp);
        encode_gif_fallback(&frames, &tmp, settings.animation_fps)
    });
    if let Err(err) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }

    persist_atomic(&tmp, target)
}

fn encode_gif(frames: &[GrayImage], tmp: &Path, fps: u16) -> Result<(), MediaError> {
    let file = File::create(tmp)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|err| MediaError::Encode(err.to_string()))?;

    let delay = Delay::from_numer_denom_ms(1000 / u32::from(fps.max(1)), 1);
    for gray in frames {
        let rgba = DynamicImage::ImageLuma8(gray.clone()).to_rgba8();
        let frame = Frame::from_parts(rgba, 0, 0, delay);
        encoder
            .encode_frame(frame)
            .map_err(|err| MediaError::Encode(err.to_string()))?;
    }
    Ok(())
}

fn encode_gif_fallback(frames: &[GrayImage], tmp: &Path, fps: u16) -> Result<(), MediaError> {
    let (width, height) = frames
        .first()
        .map(|f| (f.width() as u16, f.height() as u16))
        .ok_or_else(|| MediaError::Encode("no frames to encode".into()))?;

    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = gif::Encoder::new(&mut writer, width, height, &[])
        .map_err(|err| MediaError::Encode(err.to_string()))?;
    encoder
        .set_repeat(gif::Repeat::Infinite)
        .map_err(|err| MediaError::Encode(err.to_string()))?;

    // gif delays are in centiseconds
    let delay = (100 / fps.max(1)) as u16;
    for gray in frames {
        let rgb: Vec<u8> = gray.pixels().flat_map(|p| [p.0[0]; 3]).collect();
        let mut frame = gif::Frame::from_rgb_speed(width, height, &rgb, 10);
        frame.delay = delay;
        encoder
            .write_frame(&frame)
            .map_err(|err| MediaError::Encode(err.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::AnimationDecoder;
    use std::io::BufReader;
    use tempfile::TempDir;

    fn gradient_volume(cols: usize, rows: usize, sections: usize) -> Volume {
        let data: Vec<f32> = (0..cols * rows * sections).map(|v| v as f32).collect();
        Volume::new(cols, rows, sections, data)
    }

    #[test]
    fn test_animation_has_one_frame_per_section() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("tomogram.gif");
        let volume = gradient_volume(8, 8, 6);

        let settings = RenderSettings {
            preview_min_side: 16,
            ..RenderSettings::default()
        };
        render_animation(&volume, &target, FrameSource::Tomogram, &settings).unwrap();

        let decoder = GifDecoder::new(BufReader::new(File::open(&target).unwrap())).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 6);
        assert!(!tmp.path().join("tomogram.gif.tmp").exists());
    }

    #[test]
    fn test_frame_cap_subsamples_sections() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("tomogram.gif");
        let volume = gradient_volume(4, 4, 40);

        let settings = RenderSettings {
            preview_min_side: 8,
            tomogram_max_frames: 10,
            ..RenderSettings::default()
        };
        render_animation(&volume, &target, FrameSource::Tomogram, &settings).unwrap();

        let decoder = GifDecoder::new(BufReader::new(File::open(&target).unwrap())).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 10);
    }

    #[test]
    fn test_single_section_rejected() {
        let tmp = TempDir::new().unwrap();
        let volume = gradient_volume(4, 4, 1);
        let err = render_animation(
            &volume,
            &tmp.path().join("tomogram.gif"),
            FrameSource::Tomogram,
            &RenderSettings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("at least 2 sections"));
    }

    #[test]
    fn test_fallback_encoder_produces_readable_gif() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("fallback.gif");
        let volume = gradient_volume(8, 8, 3);
        let settings = RenderSettings {
            preview_min_side: 16,
            ..RenderSettings::default()
        };

        let frames: Vec<GrayImage> = frame_indices(volume.sections(), 50)
            .into_iter()
            .map(|i| {
                let pixels = normalize_for(FrameSource::Tomogram, volume.section(i));
                section_image(pixels, volume.cols(), volume.rows(), settings.preview_min_side)
                    .unwrap()
            })
            .collect();
        encode_gif_fallback(&frames, &target, settings.animation_fps).unwrap();

        let decoder = GifDecoder::new(BufReader::new(File::open(&target).unwrap())).unwrap();
        assert_eq!(decoder.into_frames().collect_frames().unwrap().len(), 3);
    }
}
