//! Structure discovery: turn the landing page's heading/anchor soup into
//! an ordered section → subsection outline.
//!
//! Headings (h1–h5) open sections; anchors attach to whichever section is
//! current. The scan is flattened into a tagged node list first, and the
//! grouping itself is a fold with an explicit accumulator, so the
//! algorithm can be tested against literal node lists without any HTML.

use crate::config::OverrideTable;
use crate::error::MirrorError;
use crate::paths::sanitize_component;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;
use url::Url;

/// Section name for anchors that appear before the first heading.
pub const SENTINEL_SECTION: &str = "Uncategorized";

/// Sanitized names must be longer than this to count.
const MIN_NAME_LEN: usize = 2;

/// One subsection: a leaf page expected to hold actual image content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subsection {
    pub name: String,
    pub url: String,
}

/// One section with its ordered, URL-deduplicated subsections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub subsections: Vec<Subsection>,
}

/// The ordered section → subsection mapping. Read-only once discovered.
pub type Outline = Vec<Section>;

/// A tagged node from the flattened, document-order scan of the content
/// region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineNode {
    Heading(String),
    Link { text: String, href: String },
}

/// Scan the landing page's content region for headings and anchors in
/// document order. Fails when no content region can be located.
pub fn scan_nodes(html: &str) -> Result<Vec<OutlineNode>, MirrorError> {
    let document = Html::parse_document(html);
    let region = content_region(&document).ok_or(MirrorError::Discovery)?;

    let selector = Selector::parse("h1, h2, h3, h4, h5, a").unwrap();
    let mut nodes = Vec::new();
    for element in region.select(&selector) {
        let text: String = element.text().collect();
        if element.value().name() == "a" {
            if let Some(href) = element.value().attr("href") {
                nodes.push(OutlineNode::Link {
                    text,
                    href: href.to_string(),
                });
            }
        } else {
            nodes.push(OutlineNode::Heading(text));
        }
    }
    Ok(nodes)
}

/// Prefer `main`, then `article`, then `body`, to keep sidebar and footer
/// noise out of the scan.
fn content_region(document: &Html) -> Option<ElementRef<'_>> {
    for name in ["main", "article", "body"] {
        let selector = Selector::parse(name).unwrap();
        if let Some(element) = document.select(&selector).next() {
            return Some(element);
        }
    }
    None
}

/// Accumulator threaded through the fold: the outline built so far plus
/// the name of the section currently receiving anchors.
struct FoldState {
    outline: Outline,
    current: String,
}

/// Group a tagged node list into sections.
///
/// A heading becomes the new current section when its sanitized text is
/// long enough and matches no stoplist token. An anchor attaches to the
/// current section when its resolved target is scoped under the base URL
/// (but is not the base URL itself) and its sanitized text is long
/// enough; attachment is idempotent by URL. Sections that end the fold
/// with zero links are pruned.
pub fn fold_outline(nodes: &[OutlineNode], base_url: &Url, stoplist: &[String]) -> Outline {
    let base = base_url.as_str();

    let state = nodes.iter().fold(
        FoldState {
            outline: Vec::new(),
            current: SENTINEL_SECTION.to_string(),
        },
        |mut state, node| {
            match node {
                OutlineNode::Heading(text) => {
                    let name = sanitize_component(text);
                    if name.len() > MIN_NAME_LEN
                        && !stoplist.iter().any(|token| name.contains(token.as_str()))
                    {
                        section_entry(&mut state.outline, &name);
                        state.current = name;
                    }
                }
                OutlineNode::Link { text, href } => {
                    let name = sanitize_component(text);
                    if name.len() <= MIN_NAME_LEN {
                        return state;
                    }
                    let Ok(resolved) = base_url.join(href) else {
                        return state;
                    };
                    let resolved = resolved.to_string();
                    if !resolved.starts_with(base) || resolved == base {
                        return state;
                    }
                    let current = state.current.clone();
                    let section = section_entry(&mut state.outline, &current);
                    if !section.subsections.iter().any(|s| s.url == resolved) {
                        section.subsections.push(Subsection {
                            name,
                            url: resolved,
                        });
                    }
                }
            }
            state
        },
    );

    state
        .outline
        .into_iter()
        .filter(|section| !section.subsections.is_empty())
        .collect()
}

/// Merge the manual override table: the target section is created when
/// absent, and each URL is appended only if not already present under
/// that section. Idempotent across repeated merges.
pub fn merge_overrides(outline: &mut Outline, overrides: &OverrideTable) {
    for (section_name, items) in overrides {
        let section = section_entry(outline, section_name);
        for (name, url) in items {
            if !section.subsections.iter().any(|s| s.url == *url) {
                debug!("override: {section_name} -> {name}");
                section.subsections.push(Subsection {
                    name: name.clone(),
                    url: url.clone(),
                });
            }
        }
    }
}

fn section_entry<'a>(outline: &'a mut Outline, name: &str) -> &'a mut Section {
    if let Some(index) = outline.iter().position(|s| s.name == name) {
        &mut outline[index]
    } else {
        outline.push(Section {
            name: name.to_string(),
            subsections: Vec::new(),
        });
        let last = outline.len() - 1;
        &mut outline[last]
    }
}

/// Full discovery: scan, fold, merge overrides. An empty outline after
/// the merge is fatal; the run has no hierarchy to work from.
pub fn discover(
    html: &str,
    base_url: &Url,
    stoplist: &[String],
    overrides: &OverrideTable,
) -> Result<Outline, MirrorError> {
    let nodes = scan_nodes(html)?;
    let mut outline = fold_outline(&nodes, base_url, stoplist);
    merge_overrides(&mut outline, overrides);
    outline.retain(|section| !section.subsections.is_empty());
    if outline.is_empty() {
        return Err(MirrorError::Discovery);
    }
    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn base() -> Url {
        Url::parse("https://site.test/atlas/").unwrap()
    }

    fn heading(text: &str) -> OutlineNode {
        OutlineNode::Heading(text.to_string())
    }

    fn link(text: &str, href: &str) -> OutlineNode {
        OutlineNode::Link {
            text: text.to_string(),
            href: href.to_string(),
        }
    }

    #[test]
    fn test_heading_followed_by_two_anchors() {
        let nodes = [
            heading("Skin"),
            link("Epidermis", "https://site.test/atlas/epidermis/"),
            link("Dermis", "https://site.test/atlas/dermis/"),
        ];
        let outline = fold_outline(&nodes, &base(), &[]);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].name, "Skin");
        assert_eq!(outline[0].subsections.len(), 2);
        assert_eq!(outline[0].subsections[0].name, "Epidermis");
        assert_eq!(outline[0].subsections[1].name, "Dermis");
    }

    #[test]
    fn test_heading_without_anchors_is_pruned() {
        let nodes = [
            heading("Orphan"),
            heading("Skin"),
            link("Epidermis", "https://site.test/atlas/epidermis/"),
        ];
        let outline = fold_outline(&nodes, &base(), &[]);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].name, "Skin");
    }

    #[test]
    fn test_anchors_before_first_heading_fall_under_sentinel() {
        let nodes = [link("Overview", "https://site.test/atlas/overview/")];
        let outline = fold_outline(&nodes, &base(), &[]);
        assert_eq!(outline[0].name, SENTINEL_SECTION);
    }

    #[test]
    fn test_duplicate_urls_suppressed_within_section() {
        let nodes = [
            heading("Skin"),
            link("Epidermis", "https://site.test/atlas/epidermis/"),
            link("Epidermis again", "https://site.test/atlas/epidermis/"),
        ];
        let outline = fold_outline(&nodes, &base(), &[]);
        assert_eq!(outline[0].subsections.len(), 1);
    }

    #[test]
    fn test_stoplist_token_never_becomes_a_section() {
        let nodes = [
            heading("Normal Atlas"),
            heading("Skin"),
            link("Epidermis", "https://site.test/atlas/epidermis/"),
        ];
        let outline = fold_outline(&nodes, &base(), &["Atlas".to_string()]);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].name, "Skin");
    }

    #[test]
    fn test_short_names_rejected() {
        let nodes = [
            heading("Ok"),
            link("ab", "https://site.test/atlas/short/"),
            link("Spleen", "https://site.test/atlas/spleen/"),
        ];
        // "Ok" is too short to open a section, so both fall under the
        // sentinel and only the long-named link attaches.
        let outline = fold_outline(&nodes, &base(), &[]);
        assert_eq!(outline[0].name, SENTINEL_SECTION);
        assert_eq!(outline[0].subsections.len(), 1);
        assert_eq!(outline[0].subsections[0].name, "Spleen");
    }

    #[test]
    fn test_links_outside_base_scope_rejected() {
        let nodes = [
            heading("Skin"),
            link("Elsewhere", "https://other.test/page/"),
            link("Self", "https://site.test/atlas/"),
            link("Epidermis", "https://site.test/atlas/epidermis/"),
        ];
        let outline = fold_outline(&nodes, &base(), &[]);
        assert_eq!(outline[0].subsections.len(), 1);
        assert_eq!(outline[0].subsections[0].url, "https://site.test/atlas/epidermis/");
    }

    #[test]
    fn test_relative_hrefs_resolve_against_base() {
        let nodes = [heading("Skin"), link("Epidermis", "epidermis/")];
        let outline = fold_outline(&nodes, &base(), &[]);
        assert_eq!(outline[0].subsections[0].url, "https://site.test/atlas/epidermis/");
    }

    #[test]
    fn test_merge_overrides_is_idempotent() {
        let mut outline = vec![Section {
            name: "Gastrointestinal Tract".to_string(),
            subsections: vec![Subsection {
                name: "Stomach".to_string(),
                url: "https://site.test/atlas/stomach/".to_string(),
            }],
        }];
        let mut items = BTreeMap::new();
        items.insert(
            "Appendix".to_string(),
            "https://site.test/atlas/appendix/".to_string(),
        );
        let mut overrides = OverrideTable::new();
        overrides.insert("Gastrointestinal Tract".to_string(), items);

        merge_overrides(&mut outline, &overrides);
        merge_overrides(&mut outline, &overrides);

        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].subsections.len(), 2);
    }

    #[test]
    fn test_merge_creates_missing_section() {
        let mut outline = Outline::new();
        let mut items = BTreeMap::new();
        items.insert(
            "Tonsil".to_string(),
            "https://site.test/atlas/tonsil/".to_string(),
        );
        let mut overrides = OverrideTable::new();
        overrides.insert("Head and Neck".to_string(), items);

        merge_overrides(&mut outline, &overrides);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].name, "Head and Neck");
    }

    #[test]
    fn test_scan_collects_nodes_in_document_order() {
        let html = r#"
            <html><body><main>
              <h2>Skin</h2>
              <a href="https://site.test/atlas/epidermis/">Epidermis</a>
              <h3>Breast</h3>
              <a href="https://site.test/atlas/lobule/">Lobule</a>
            </main></body></html>
        "#;
        let nodes = scan_nodes(html).unwrap();
        assert_eq!(
            nodes,
            vec![
                OutlineNode::Heading("Skin".to_string()),
                OutlineNode::Link {
                    text: "Epidermis".to_string(),
                    href: "https://site.test/atlas/epidermis/".to_string(),
                },
                OutlineNode::Heading("Breast".to_string()),
                OutlineNode::Link {
                    text: "Lobule".to_string(),
                    href: "https://site.test/atlas/lobule/".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_scan_prefers_main_region_over_body() {
        let html = r#"
            <html><body>
              <nav><a href="https://site.test/atlas/sidebar/">Sidebar link</a></nav>
              <main><h2>Skin</h2></main>
            </body></html>
        "#;
        let nodes = scan_nodes(html).unwrap();
        assert_eq!(nodes, vec![OutlineNode::Heading("Skin".to_string())]);
    }

    #[test]
    fn test_discover_end_to_end() {
        let html = r#"
            <html><body><main>
              <h1>The Atlas Collection</h1>
              <h2>Skin</h2>
              <a href="epidermis/">Epidermis</a>
              <a href="dermis/">Dermis</a>
              <h2>Empty Chapter</h2>
            </main></body></html>
        "#;
        let outline = discover(
            html,
            &base(),
            &["Collection".to_string()],
            &OverrideTable::new(),
        )
        .unwrap();
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].name, "Skin");
        assert_eq!(outline[0].subsections.len(), 2);
    }

    #[test]
    fn test_discover_fails_on_empty_outline() {
        let err = discover("<html><body></body></html>", &base(), &[], &OverrideTable::new())
            .unwrap_err();
        assert!(matches!(err, MirrorError::Discovery));
    }
}
