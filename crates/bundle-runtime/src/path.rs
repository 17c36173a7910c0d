//! Bundle path normalisation.
//!
//! Registry rows sometimes name a bundle by its directory path instead of
//! its manifest identifier, written with whichever separator the admin tool
//! happened to use. Both sides are normalised to the same form before
//! comparison: `/` separators, no empty segments, no `.` segments, no
//! leading or trailing separator.

use std::path::{Component, Path};

/// Normalise a path-like identifier.
pub fn normalize_bundle_path(raw: &str) -> String {
    raw.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalise `dir` relative to `root`. Returns `None` when `dir` is not
/// under `root`.
pub fn relative_bundle_path(root: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(normalize_bundle_path(&segments.join("/")))
}
