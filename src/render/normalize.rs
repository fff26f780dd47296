//! Percentile-based intensity normalization.
//!
//! Volume samples are arbitrary floats; display needs 8-bit intensities.
//! Each flavor clips to a percentile window before the linear rescale:
//! tomogram slices get a tight 1–99 window to maximize contrast, tilt-series
//! slices a wider 0.5–99.5 window to preserve dynamic range. Flat input maps
//! to all-zero output rather than dividing by zero.

use crate::media::FrameSource;

/// Percentile window for tomogram slices and generic stills.
const TOMOGRAM_WINDOW: (f64, f64) = (1.0, 99.0);

/// Percentile window for tilt-series slices.
const TILTSERIES_WINDOW: (f64, f64) = (0.5, 99.5);

/// Normalizes a tomogram slice to 8-bit intensities.
pub fn normalize_tomogram(data: &[f32]) -> Vec<u8> {
    normalize(data, TOMOGRAM_WINDOW.0, TOMOGRAM_WINDOW.1)
}

/// Normalizes a tilt-series slice to 8-bit intensities.
pub fn normalize_tiltseries(data: &[f32]) -> Vec<u8> {
    normalize(data, TILTSERIES_WINDOW.0, TILTSERIES_WINDOW.1)
}

/// Normalizes a single still image plane to 8-bit intensities.
pub fn normalize_still(data: &[f32]) -> Vec<u8> {
    normalize(data, TOMOGRAM_WINDOW.0, TOMOGRAM_WINDOW.1)
}

/// Normalization matching the slice flavor of a frame source.
pub fn normalize_for(source: FrameSource, data: &[f32]) -> Vec<u8> {
    match source {
        FrameSource::TiltSeries => normalize_tiltseries(data),
        FrameSource::Tomogram => normalize_tomogram(data),
    }
}

/// Clips to the `[lo, hi]` percentile window and rescales linearly to 0–255.
pub fn normalize(data: &[f32], lo: f64, hi: f64) -> Vec<u8> {
    let clean = sanitize(data);

    let mut sorted = clean.clone();
    sorted.sort_unstable_by(f32::total_cmp);
    let p_low = percentile(&sorted, lo);
    let p_high = percentile(&sorted, hi);

    if p_high <= p_low {
        // Flat data: nothing to stretch
        return vec![0u8; clean.len()];
    }

    let range = (p_high - p_low) as f64;
    clean
        .iter()
        .map(|&v| {
            let clipped = v.clamp(p_low, p_high);
            (((clipped - p_low) as f64 / range) * 255.0) as u8
        })
        .collect()
}

/// Replaces NaN and infinite samples with the finite bounds of the data.
///
/// NaN and -Inf map to the finite minimum, +Inf to the finite maximum. If no
/// finite sample exists the output is all zeros.
pub fn sanitize(data: &[f32]) -> Vec<f32> {
    let mut finite_min = f32::INFINITY;
    let mut finite_max = f32::NEG_INFINITY;
    for &v in data {
        if v.is_finite() {
            finite_min = finite_min.min(v);
            finite_max = finite_max.max(v);
        }
    }
    if finite_min > finite_max {
        return vec![0.0; data.len()];
    }

    data.iter()
        .map(|&v| {
            if v.is_finite() {
                v
            } else if v == f32::INFINITY {
                finite_max
            } else {
                finite_min
            }
        })
        .collect()
}

/// Percentile with linear interpolation over pre-sorted data.
fn percentile(sorted: &[f32], p: f64) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    (sorted[lower] as f64 * (1.0 - weight) + sorted[upper] as f64 * weight) as f32
}
