//! Filesystem naming helpers for mirrored assets.
//!
//! Folder paths are a deterministic function of the sanitized section and
//! subsection names; filenames derive from the source URL, so the same URL
//! always lands at the same path.

use std::path::{Path, PathBuf};

/// Filename used when a URL has no usable final path segment.
pub const FALLBACK_FILENAME: &str = "index.jpg";

/// Extensions recognized as image content, lowercase.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Reduce text to a form safe for folder names: alphanumerics, spaces, and
/// dashes survive, everything else is dropped, surrounding whitespace trimmed.
pub fn sanitize_component(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Destination folder for one subsection's assets. Deterministic in the
/// section and subsection names, so repeated runs land in the same place.
pub fn subsection_dir(root: &Path, section: &str, subsection: &str) -> PathBuf {
    root.join(sanitize_component(section))
        .join(sanitize_component(subsection))
}

/// Derive a filename from a URL's final path segment, query string stripped.
pub fn image_filename(url: &str) -> String {
    let name = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .to_string(),
        // Relative or malformed input: take everything after the last slash.
        Err(_) => url.rsplit('/').next().unwrap_or("").to_string(),
    };
    let name = name.split('?').next().unwrap_or("");
    if name.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        name.to_string()
    }
}

/// Whether a path or URL ends in a recognized image extension
/// (case-insensitive).
pub fn has_image_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}
