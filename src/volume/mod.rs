//! Volume decoding.
//!
//! A [`Volume`] is the in-memory form of one tomography acquisition: a stack
//! of `sections` planes, each `rows` × `cols`, with every sample widened to
//! `f32` regardless of the on-disk mode. Parsing lives in [`mrc`]; nothing
//! here knows about caching or scheduling.

pub mod mrc;

pub use mrc::read_volume;

/// A decoded volume. Sections are indexed along the first (slowest) axis.
#[derive(Debug, Clone)]
pub struct Volume {
    cols: usize,
    rows: usize,
    sections: usize,
    data: Vec<f32>,
}

impl Volume {
    /// Assembles a volume from raw samples.
    ///
    /// The sample count must equal `cols * rows * sections`.
    pub fn new(cols: usize, rows: usize, sections: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), cols * rows * sections);
        Self {
            cols,
            rows,
            sections,
            data,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of planes along the first axis. One for a plain 2-D image.
    pub fn sections(&self) -> usize {
        self.sections
    }

    /// Whether this is a true 3-D stack rather than a single plane.
    pub fn is_stack(&self) -> bool {
        self.sections > 1
    }

    /// Samples of one section, row-major.
    pub fn section(&self, index: usize) -> &[f32] {
        let plane = self.cols * self.rows;
        &self.data[index * plane..(index + 1) * plane]
    }

    /// The middle section — the representative plane for thumbnails.
    pub fn middle_section(&self) -> &[f32] {
        self.section(self.sections / 2)
    }

    /// All samples, section-major.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// True when every sample is exactly zero.
    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }
}
