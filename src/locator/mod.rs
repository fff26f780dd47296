//! Source file resolution.
//!
//! [`FileLocator`] maps `(item id, source category)` to a concrete file under
//! the configured search roots. Resolution is a two-phase lookup:
//!
//! 1. **Exact probe**: `{root}/{item}{ext}` for each recognized extension of
//!    the category, longest (most specific) extension first, so a compound
//!    suffix like `_rec.mrc` wins over a bare `.mrc`.
//! 2. **Recursive scan**: walk the root collecting files whose name contains
//!    the item id (case-insensitive) and ends with a recognized extension;
//!    candidates whose canonical basename equals the item id are preferred,
//!    then extension specificity breaks ties.
//!
//! Not finding a file is a normal outcome (`None`), never an error: the
//! pipeline surfaces it as a source-missing status.

mod basename;

pub use basename::canonical_basename;

use crate::config::SourcePaths;
use crate::media::{ItemId, SourceCategory};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recognized extensions per source category, in declaration order.
/// Lookup sorts them by length so compound suffixes are probed first.
const TOMOGRAM_EXTENSIONS: &[&str] = &[".mrc", "_rec.mrc", ".rec", ".rec.mrc", "_rec"];
const TILTSERIES_EXTENSIONS: &[&str] = &["_ali.mrc", ".ali", ".st", ".st.mrc"];
const LOWMAG_EXTENSIONS: &[&str] = &[".mrc", ".dm4", ".tif", ".tiff", ".jpg", ".jpeg", ".png"];

/// Extensions of tilt-angle sidecar files.
const TILT_ANGLE_EXTENSIONS: &[&str] = &[".rawtlt", ".tlt"];

fn extensions_for(category: SourceCategory) -> &'static [&'static str] {
    match category {
        SourceCategory::Tomogram => TOMOGRAM_EXTENSIONS,
        SourceCategory::TiltSeries => TILTSERIES_EXTENSIONS,
        SourceCategory::Lowmag => LOWMAG_EXTENSIONS,
    }
}

/// Locates source files for catalogue items under the configured roots.
#[derive(Debug, Clone)]
pub struct FileLocator {
    sources: SourcePaths,
}

/// A file found during the recursive scan.
struct Candidate {
    path: PathBuf,
    /// Index into the length-sorted extension list; lower is more specific.
    ext_rank: usize,
    basename: String,
}

impl FileLocator {
    /// Creates a locator over the given source roots.
    pub fn new(sources: SourcePaths) -> Self {
        Self { sources }
    }

    /// Whether a search root is configured for the category at all.
    ///
    /// Background generation skips unconfigured categories; explicit requests
    /// run regardless so the miss surfaces as an error status.
    pub fn root_configured(&self, category: SourceCategory) -> bool {
        self.sources.root(category).is_some()
    }

    /// Finds the best-matching source file for an item in a category.
    ///
    /// Returns `None` when the category's root is unset or missing, or when
    /// no candidate matches.
    pub fn find_source(&self, category: SourceCategory, item: &ItemId) -> Option<PathBuf> {
        self.find_in(self.sources.root(category), item, extensions_for(category))
    }

    fn find_in(
        &self,
        directory: Option<&Path>,
        item: &ItemId,
        extensions: &[&str],
    ) -> Option<PathBuf> {
        let Some(directory) = directory else {
            debug!(item = %item, "source root not configured");
            return None;
        };
        if !directory.exists() {
            warn!(directory = %directory.display(), "source root does not exist");
            return None;
        }

        // Longer extensions first so `_rec.mrc` beats `.mrc`
        let mut sorted: Vec<&str> = extensions.to_vec();
        sorted.sort_by_key(|ext| std::cmp::Reverse(ext.len()));

        for ext in &sorted {
            let path = directory.join(format!("{}{}", item.as_str(), ext));
            if path.is_file() {
                debug!(path = %path.display(), "exact source match");
                return Some(path);
            }
        }

        let candidates = self.scan(directory, item, &sorted);
        if candidates.is_empty() {
            warn!(item = %item, directory = %directory.display(), "no source file found");
            return None;
        }

        let item_lower = item.as_str().to_lowercase();
        let best = candidates
            .iter()
            .filter(|c| c.basename.to_lowercase() == item_lower)
            .min_by_key(|c| c.ext_rank)
            .or_else(|| candidates.iter().min_by_key(|c| c.ext_rank))?;

        debug!(path = %best.path.display(), "best source match from scan");
        Some(best.path.clone())
    }

    /// Recursively collects files whose name contains the item id and ends
    /// with one of the recognized extensions.
    fn scan(&self, directory: &Path, item: &ItemId, sorted_exts: &[&str]) -> Vec<Candidate> {
        let item_lower = item.as_str().to_lowercase();
        let mut candidates = Vec::new();

        for entry in WalkDir::new(directory)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let name_lower = name.to_lowercase();
            if !name_lower.contains(&item_lower) {
                continue;
            }
            // First matching extension only: the list is specificity-ordered
            if let Some(rank) = sorted_exts
                .iter()
                .position(|ext| name_lower.ends_with(&ext.to_lowercase()))
            {
                candidates.push(Candidate {
                    path: entry.into_path(),
                    ext_rank: rank,
                    basename: canonical_basename(&name),
                });
            }
        }

        candidates
    }

    /// Finds the tilt-angle sidecar file (`.rawtlt` or `.tlt`) for an item.
    ///
    /// Probes the tilt-series root first, then falls back to the tomogram
    /// root.
    pub fn find_tilt_angle_file(&self, item: &ItemId) -> Option<PathBuf> {
        for category in [SourceCategory::TiltSeries, SourceCategory::Tomogram] {
            let Some(root) = self.sources.root(category) else {
                continue;
            };
            if !root.is_dir() {
                continue;
            }
            for ext in TILT_ANGLE_EXTENSIONS {
                let path = root.join(format!("{}{}", item.as_str(), ext));
                if path.is_file() {
                    debug!(path = %path.display(), "found tilt angle file");
                    return Some(path);
                }
            }
        }
        warn!(item = %item, "no tilt angle file found");
        None
    }
}

/// Parses a tilt-angle file: one angle per line, non-numeric lines skipped.
pub fn parse_tilt_angles(path: &Path) -> Option<Vec<f64>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let angles: Vec<f64> = raw
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .collect();
    Some(angles)
}
