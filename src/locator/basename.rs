//! Canonical basename derivation for processed volume files.
//!
//! Acquisition and reconstruction software decorates file names with
//! processing markers (`_rec`, `_ali`, binning factors, pixel sizes,
//! resolution tags). To match a file against a catalogue item id, those
//! markers are stripped in order of specificity.

use regex::Regex;
use std::sync::LazyLock;

/// Known suffixes, most specific first. Only the first match is removed.
const SUFFIXES: &[&str] = &[
    // reconstruction markers
    "_rec.mrc", "_rec", ".rec.mrc", ".rec", ".mrc",
    // alignment / tilt-series markers
    "_ali.mrc", "_ali", ".ali.mrc", ".ali", ".st", ".st.mrc",
    // plain image formats used for overviews
    ".dm4", ".tif", ".tiff", ".jpg", ".jpeg", ".png",
];

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)_rec",
        r"(?i)_ali",
        // binning factor, e.g. _bin8
        r"(?i)_bin\d+$",
        // pixel size annotation, e.g. _10.00Apx
        r"(?i)_\d+\.\d+Apx$",
        // resolution marker, e.g. _8k
        r"(?i)_\d+k$",
        // generic trailing parameter, e.g. _param123
        r"(?i)_[a-z]+\d+$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("suffix pattern must compile"))
    .collect()
});

/// Derives the canonical basename of a file name by stripping known
/// processing suffixes and trailing parameter markers.
///
/// ```
/// use tomoshelf::locator::canonical_basename;
///
/// assert_eq!(canonical_basename("cell_01_rec.mrc"), "cell_01");
/// assert_eq!(canonical_basename("cell_01_bin8.mrc"), "cell_01");
/// ```
pub fn canonical_basename(filename: &str) -> String {
    // Strip any path component
    let mut name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_string();

    let lower = name.to_lowercase();
    for suffix in SUFFIXES {
        if lower.ends_with(&suffix.to_lowercase()) {
            name.truncate(name.len() - suffix.len());
            break;
        }
    }

    for pattern in PATTERNS.iter() {
        if let Some(m) = pattern.find(&name) {
            name.truncate(m.start());
        }
    }

    name
}
