//! Shared helpers for integration tests.

use std::fs;
use std::path::Path;

/// Fixed MRC header length.
pub const HEADER_LEN: usize = 1024;

/// Writes a little-endian mode-2 (f32) MRC volume with a simple gradient
/// payload, valid for the pipeline's volume reader.
pub fn write_mrc(path: &Path, cols: i32, rows: i32, sections: i32) {
    let mut bytes = vec![0u8; HEADER_LEN];
    bytes[0..4].copy_from_slice(&cols.to_le_bytes());
    bytes[4..8].copy_from_slice(&rows.to_le_bytes());
    bytes[8..12].copy_from_slice(&sections.to_le_bytes());
    bytes[12..16].copy_from_slice(&2i32.to_le_bytes());
    bytes[208..212].copy_from_slice(b"MAP ");
    bytes[212] = 0x44;
    bytes[213] = 0x44;

    let count = (cols * rows * sections) as usize;
    for i in 0..count {
        bytes.extend_from_slice(&(i as f32).to_le_bytes());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}
