//! MRC container parsing.
//!
//! MRC is the de-facto interchange format for electron microscopy volumes:
//! a fixed 1024-byte header, an optional extended header, then the sample
//! data in one of a few numeric modes. Parsing here is deliberately
//! permissive — a missing `MAP ` magic or an unrecognized machine stamp is
//! logged and tolerated, matching how real-world files behave — but
//! structural problems (truncated data, unsupported mode, zero dimensions)
//! are hard errors.
//!
//! Layout of the fields we read:
//!
//! ```text
//! offset   0  i32  nx   columns (fastest axis)
//! offset   4  i32  ny   rows
//! offset   8  i32  nz   sections (slowest axis)
//! offset  12  i32  mode 0=i8 1=i16 2=f32 6=u16
//! offset  92  i32  nsymbt   extended header length in bytes
//! offset 208  [u8;4] "MAP " magic
//! offset 212  [u8;4] machine stamp: 0x44.. little endian, 0x11.. big endian
//! ```

use super::Volume;
use crate::error::MediaError;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Fixed MRC header length in bytes.
pub const HEADER_LEN: usize = 1024;

/// Sanity cap on any single dimension.
const MAX_DIMENSION: i32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

/// Reads and validates a volume from an MRC file.
///
/// Validation per the media pipeline contract: the file must exist, be
/// non-empty, parse as a valid container, contain a data block, and not be
/// all-zero. NaN and infinite samples are tolerated here; the render layer
/// replaces them with finite bounds before display-range computation.
pub fn read_volume(path: &Path) -> Result<Volume, MediaError> {
    let bytes = fs::read(path)?;

    if bytes.is_empty() {
        return Err(MediaError::invalid(path, "file is empty"));
    }
    if bytes.len() < HEADER_LEN {
        return Err(MediaError::invalid(
            path,
            format!("file too short for MRC header: {} bytes", bytes.len()),
        ));
    }

    let order = detect_byte_order(&bytes, path);
    let nx = read_i32(&bytes, 0, order);
    let ny = read_i32(&bytes, 4, order);
    let nz = read_i32(&bytes, 8, order);
    let mode = read_i32(&bytes, 12, order);
    let nsymbt = read_i32(&bytes, 92, order);

    if &bytes[208..212] != b"MAP " {
        warn!(path = %path.display(), "MRC magic missing, parsing permissively");
    }

    for (axis, dim) in [("nx", nx), ("ny", ny), ("nz", nz)] {
        if dim <= 0 || dim > MAX_DIMENSION {
            return Err(MediaError::invalid(
                path,
                format!("implausible dimension {axis}={dim}"),
            ));
        }
    }
    if nsymbt < 0 {
        return Err(MediaError::invalid(
            path,
            format!("negative extended header length {nsymbt}"),
        ));
    }

    let sample_size = match mode {
        0 => 1, // i8
        1 => 2, // i16
        2 => 4, // f32
        6 => 2, // u16
        other => {
            return Err(MediaError::invalid(
                path,
                format!("unsupported MRC mode {other}"),
            ));
        }
    };

    let (cols, rows, sections) = (nx as usize, ny as usize, nz as usize);
    let count = cols
        .checked_mul(rows)
        .and_then(|v| v.checked_mul(sections))
        .ok_or_else(|| MediaError::invalid(path, "dimension overflow"))?;

    let data_start = HEADER_LEN + nsymbt as usize;
    let data_end = data_start
        .checked_add(count * sample_size)
        .ok_or_else(|| MediaError::invalid(path, "data extent overflow"))?;
    if bytes.len() < data_end {
        return Err(MediaError::invalid(
            path,
            format!(
                "truncated data block: need {} bytes, have {}",
                data_end,
                bytes.len()
            ),
        ));
    }

    let raw = &bytes[data_start..data_end];
    let data = decode_samples(raw, mode, order);

    let volume = Volume::new(cols, rows, sections, data);
    if volume.is_all_zero() {
        return Err(MediaError::invalid(path, "volume contains only zeros"));
    }
    if volume.samples().iter().any(|v| !v.is_finite()) {
        warn!(path = %path.display(), "volume contains NaN or infinite samples");
    }

    Ok(volume)
}

fn detect_byte_order(bytes: &[u8], path: &Path) -> ByteOrder {
    match bytes[212] {
        0x44 => ByteOrder::Little,
        0x11 => ByteOrder::Big,
        stamp => {
            warn!(path = %path.display(), stamp, "unrecognized machine stamp, assuming little endian");
            ByteOrder::Little
        }
    }
}

fn read_i32(bytes: &[u8], offset: usize, order: ByteOrder) -> i32 {
    let word: [u8; 4] = bytes[offset..offset + 4].try_into().unwrap_or([0; 4]);
    match order {
        ByteOrder::Little => i32::from_le_bytes(word),
        ByteOrder::Big => i32::from_be_bytes(word),
    }
}

fn decode_samples(raw: &[u8], mode: i32, order: ByteOrder) -> Vec<f32> {
    match mode {
        0 => raw.iter().map(|&b| b as i8 as f32).collect(),
        1 => raw
            .chunks_exact(2)
            .map(|c| {
                let word = [c[0], c[1]];
                let v = match order {
                    ByteOrder::Little => i16::from_le_bytes(word),
                    ByteOrder::Big => i16::from_be_bytes(word),
                };
                v as f32
            })
            .collect(),
        6 => raw
            .chunks_exact(2)
            .map(|c| {
                let word = [c[0], c[1]];
                let v = match order {
                    ByteOrder::Little => u16::from_le_bytes(word),
                    ByteOrder::Big => u16::from_be_bytes(word),
                };
                v as f32
            })
            .collect(),
        _ => raw
            .chunks_exact(4)
            .map(|c| {
                let word = [c[0], c[1], c[2], c[3]];
                match order {
                    ByteOrder::Little => f32::from_le_bytes(word),
                    ByteOrder::Big => f32::from_be_bytes(word),
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn build_mrc(cols: i32, rows: i32, sections: i32, mode: i32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&cols.to_le_bytes());
        bytes[4..8].copy_from_slice(&rows.to_le_bytes());
        bytes[8..12].copy_from_slice(&sections.to_le_bytes());
        bytes[12..16].copy_from_slice(&mode.to_le_bytes());
        bytes[208..212].copy_from_slice(b"MAP ");
        bytes[212] = 0x44;
        bytes[213] = 0x44;
        bytes.extend_from_slice(payload);
        bytes
    }

    fn write_file(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_f32_volume() {
        let samples: Vec<f32> = (0..12).map(|v| v as f32 + 1.0).collect();
        let payload: Vec<u8> = samples.iter().flat_map(|v| v.to_le_bytes()).collect();
        let file = write_file(&build_mrc(2, 2, 3, 2, &payload));

        let volume = read_volume(file.path()).unwrap();
        assert_eq!(volume.cols(), 2);
        assert_eq!(volume.rows(), 2);
        assert_eq!(volume.sections(), 3);
        assert_eq!(volume.section(1), &[5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_reads_i16_volume() {
        let samples: [i16; 4] = [-3, 0, 7, 100];
        let payload: Vec<u8> = samples.iter().flat_map(|v| v.to_le_bytes()).collect();
        let file = write_file(&build_mrc(2, 2, 1, 1, &payload));

        let volume = read_volume(file.path()).unwrap();
        assert_eq!(volume.samples(), &[-3.0, 0.0, 7.0, 100.0]);
    }

    #[test]
    fn test_rejects_empty_file() {
        let file = write_file(b"");
        assert!(matches!(
            read_volume(file.path()),
            Err(MediaError::InvalidVolume { .. })
        ));
    }

    #[test]
    fn test_rejects_all_zero_volume() {
        let payload = vec![0u8; 4 * 4];
        let file = write_file(&build_mrc(2, 2, 1, 2, &payload));
        let err = read_volume(file.path()).unwrap_err();
        assert!(err.to_string().contains("only zeros"));
    }

    #[test]
    fn test_rejects_truncated_data() {
        let payload = vec![1u8; 7]; // needs 16 bytes for 2x2x1 f32
        let file = write_file(&build_mrc(2, 2, 1, 2, &payload));
        let err = read_volume(file.path()).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_rejects_unsupported_mode() {
        let payload = vec![1u8; 64];
        let file = write_file(&build_mrc(2, 2, 1, 4, &payload));
        let err = read_volume(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported MRC mode"));
    }

    #[test]
    fn test_tolerates_missing_magic() {
        let samples: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let payload: Vec<u8> = samples.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut bytes = build_mrc(2, 2, 1, 2, &payload);
        bytes[208..212].copy_from_slice(b"\0\0\0\0");
        let file = write_file(&bytes);
        assert!(read_volume(file.path()).is_ok());
    }

    #[test]
    fn test_big_endian_samples() {
        let samples: Vec<f32> = vec![1.5, -2.5, 3.0, 4.0];
        let payload: Vec<u8> = samples.iter().flat_map(|v| v.to_be_bytes()).collect();
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&2i32.to_be_bytes());
        bytes[4..8].copy_from_slice(&2i32.to_be_bytes());
        bytes[8..12].copy_from_slice(&1i32.to_be_bytes());
        bytes[12..16].copy_from_slice(&2i32.to_be_bytes());
        bytes[208..212].copy_from_slice(b"MAP ");
        bytes[212] = 0x11;
        bytes[213] = 0x11;
        bytes.extend_from_slice(&payload);
        let file = write_file(&bytes);

        let volume = read_volume(file.path()).unwrap();
        assert_eq!(volume.samples(), &[1.5, -2.5, 3.0, 4.0]);
    }
}
