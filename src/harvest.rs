//! Leaf-page harvesting: extract original-resolution image targets from a
//! rendered subsection page.
//!
//! Two passes over the DOM (anchors that link straight at image files,
//! then img sources with thumbnail suffixes stripped) merge into one
//! URL-keyed set. Performs no network I/O.

use crate::error::MirrorError;
use crate::paths::has_image_extension;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Substring identifying a downsized thumbnail variant.
const THUMB_MARKER: &str = "150x150";

/// Dimension suffixes stripped from an img source to recover the
/// full-resolution filename.
const THUMB_SUFFIXES: [&str; 2] = ["-150x150", "-300x300"];

/// Site chrome, never content.
const CHROME_MARKERS: [&str; 3] = ["icon", "logo", "gravatar"];

/// Collect the deduplicated set of absolute image URLs on one page.
pub fn harvest_targets(html: &str, page_url: &Url) -> Result<BTreeSet<String>, MirrorError> {
    let document = Html::parse_document(html);
    let mut targets = BTreeSet::new();

    // Pass 1: anchors pointing directly at an image file. Thumbnails
    // linked by marker-bearing URLs are someone else's rendition.
    let anchor_selector = Selector::parse("a[href]").unwrap();
    for element in document.select(&anchor_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !has_image_extension(href) || href.contains(THUMB_MARKER) {
            continue;
        }
        if let Ok(resolved) = page_url.join(href) {
            targets.insert(resolved.to_string());
        }
    }

    // Pass 2: img sources. A marker-bearing source gets its dimension
    // suffixes stripped to point back at the original.
    let img_selector = Selector::parse("img[src]").unwrap();
    for element in document.select(&img_selector) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let candidate = if src.contains(THUMB_MARKER) {
            strip_thumb_suffixes(src)
        } else {
            src.to_string()
        };
        if let Ok(resolved) = page_url.join(&candidate) {
            targets.insert(resolved.to_string());
        }
    }

    targets.retain(|url| {
        let lower = url.to_ascii_lowercase();
        !CHROME_MARKERS.iter().any(|marker| lower.contains(marker))
    });

    if targets.is_empty() {
        return Err(MirrorError::EmptyHarvest {
            url: page_url.to_string(),
        });
    }
    Ok(targets)
}

fn strip_thumb_suffixes(src: &str) -> String {
    let mut out = src.to_string();
    for suffix in THUMB_SUFFIXES {
        out = out.replace(suffix, "");
    }
    out
}
