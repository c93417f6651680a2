//! Run configuration and the operator-maintained override table.
//!
//! The override table records sections and items the discovery heuristics
//! are known to miss on a given site. It lives in an external JSON file so
//! operators can extend it without touching the discovery algorithm:
//!
//! ```json
//! { "Gastrointestinal Tract": { "Appendix": "https://site/atlas/appendix/" } }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Section name → {item name → URL}. BTreeMap keeps merge order
/// deterministic across runs.
pub type OverrideTable = BTreeMap<String, BTreeMap<String, String>>;

/// Configuration for one mirror run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Landing page URL. Normalized to end with a slash so subsection
    /// scope checks are plain prefix comparisons.
    pub base_url: String,
    /// Root of the output directory tree.
    pub output_root: PathBuf,
    /// Single threshold with two uses: an existing file strictly larger
    /// than this counts as already downloaded, and a decoded payload
    /// strictly smaller than this is rejected as a placeholder.
    #[serde(default = "default_min_content_bytes")]
    pub min_content_bytes: u64,
    /// Pacing delay between subsection visits.
    #[serde(default = "default_subsection_delay_ms")]
    pub subsection_delay_ms: u64,
    /// Delay after scrolling a leaf page, so lazy-loaded media settles.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub nav_timeout_ms: u64,
    /// Deadline on the awaited in-page fetch. A stalled fetch maps to a
    /// fetch failure instead of blocking the run indefinitely.
    #[serde(default = "default_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Tokens that disqualify a heading from becoming a section name,
    /// e.g. the site's own title repeated across the page.
    #[serde(default)]
    pub heading_stoplist: Vec<String>,
    #[serde(default)]
    pub overrides: OverrideTable,
}

fn default_min_content_bytes() -> u64 {
    1000
}

fn default_subsection_delay_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    3000
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl MirrorConfig {
    pub fn new(base_url: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            output_root: output_root.into(),
            min_content_bytes: default_min_content_bytes(),
            subsection_delay_ms: default_subsection_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            nav_timeout_ms: default_timeout_ms(),
            fetch_timeout_ms: default_timeout_ms(),
            heading_stoplist: Vec::new(),
            overrides: OverrideTable::new(),
        }
    }
}

/// Load the override table from an operator-edited JSON file.
pub fn load_overrides(path: &Path) -> Result<OverrideTable> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read overrides file: {}", path.display()))?;
    let table = serde_json::from_str(&raw)
        .with_context(|| format!("overrides file is not valid JSON: {}", path.display()))?;
    Ok(table)
}
