//! Frame-set export for interactive scrubbing.
//!
//! Instead of a fixed animation, a frame set is a directory of numbered JPEGs
//! (`0.jpg`, `1.jpg`, …) the viewer can seek through. The set is built in a
//! temp directory and renamed into place so a partially written set is never
//! observable.

use super::normalize::normalize_for;
use super::{frame_indices, section_image};
use crate::config::RenderSettings;
use crate::error::MediaError;
use crate::media::FrameSource;
use crate::volume::Volume;
use image::codecs::jpeg::JpegEncoder;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Exports a numbered JPEG frame set into `target_dir`, returning the number
/// of frames written.
///
/// Sections are sampled evenly up to the export frame cap. A single-section
/// volume yields a one-frame set; unlike animations that is a valid result.
/// Any existing set at `target_dir` is replaced.
pub fn export_frames(
    volume: &Volume,
    target_dir: &Path,
    source: FrameSource,
    settings: &RenderSettings,
) -> Result<usize, MediaError> {
    let staging = staging_dir(target_dir);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let indices = frame_indices(volume.sections(), settings.export_max_frames);
    let result = write_frames(volume, &staging, source, settings, &indices);
    if let Err(err) = result {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    fs::rename(&staging, target_dir)?;
    debug!(
        target = %target_dir.display(),
        frames = indices.len(),
        "exported frame set"
    );
    Ok(indices.len())
}

fn staging_dir(target_dir: &Path) -> std::path::PathBuf {
    let mut name = target_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".tmp");
    target_dir.with_file_name(name)
}

fn write_frames(
    volume: &Volume,
    staging: &Path,
    source: FrameSource,
    settings: &RenderSettings,
    indices: &[usize],
) -> Result<(), MediaError> {
    for (number, &index) in indices.iter().enumerate() {
        let pixels = normalize_for(source, volume.section(index));
        let gray = section_image(
            pixels,
            volume.cols(),
            volume.rows(),
            settings.preview_min_side,
        )?;

        let path = staging.join(format!("{number}.jpg"));
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, settings.frame_jpeg_quality);
        gray.write_with_encoder(encoder)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gradient_volume(cols: usize, rows: usize, sections: usize) -> Volume {
        let data: Vec<f32> = (0..cols * rows * sections).map(|v| v as f32).collect();
        Volume::new(cols, rows, sections, data)
    }

    fn settings() -> RenderSettings {
        RenderSettings {
            preview_min_side: 16,
            ..RenderSettings::default()
        }
    }

    #[test]
    fn test_exports_numbered_frames() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("frames_tomogram");
        let volume = gradient_volume(8, 8, 5);

        let count = export_frames(&volume, &target, FrameSource::Tomogram, &settings()).unwrap();
        assert_eq!(count, 5);
        for i in 0..5 {
            let frame = target.join(format!("{i}.jpg"));
            assert!(frame.is_file(), "missing {frame:?}");
            assert!(image::open(&frame).is_ok());
        }
        assert!(!tmp.path().join("frames_tomogram.tmp").exists());
    }

    #[test]
    fn test_single_section_volume_yields_one_frame() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("frames_tiltseries");
        let volume = gradient_volume(8, 8, 1);

        let count = export_frames(&volume, &target, FrameSource::TiltSeries, &settings()).unwrap();
        assert_eq!(count, 1);
        assert!(target.join("0.jpg").is_file());
    }

    #[test]
    fn test_existing_set_replaced() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("frames_tomogram");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("99.jpg"), b"stale").unwrap();

        let volume = gradient_volume(8, 8, 2);
        export_frames(&volume, &target, FrameSource::Tomogram, &settings()).unwrap();

        assert!(!target.join("99.jpg").exists());
        assert!(target.join("0.jpg").is_file());
        assert!(target.join("1.jpg").is_file());
    }

    #[test]
    fn test_export_cap_subsamples() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("frames_tomogram");
        let volume = gradient_volume(4, 4, 40);

        let mut cfg = settings();
        cfg.export_max_frames = 8;
        let count = export_frames(&volume, &target, FrameSource::Tomogram, &cfg).unwrap();
        assert_eq!(count, 8);
    }
}
