//! `vitrine outline <url>` — discover and print the section structure
//! without downloading anything.

use super::mirror_cmd::StdinGate;
use crate::config::{self, MirrorConfig};
use crate::mirror::Mirror;
use crate::outline::Outline;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Run the outline command.
pub async fn run(
    url: &str,
    overrides: Option<&Path>,
    skip_headings: &[String],
    json: bool,
) -> Result<()> {
    // No output root: discovery never touches the filesystem.
    let mut config = MirrorConfig::new(url, PathBuf::new());
    config.heading_stoplist = skip_headings.to_vec();
    if let Some(path) = overrides {
        config.overrides = config::load_overrides(path)?;
    }

    let renderer = ChromiumRenderer::new().await?;
    let mut ctx = renderer.new_context().await?;

    let result = Mirror::new(config).discover(ctx.as_mut(), &StdinGate).await;

    if let Err(e) = ctx.close().await {
        warn!("context close failed: {e:#}");
    }
    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }

    let outline = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outline)?);
    } else {
        print_outline(&outline);
    }
    Ok(())
}

fn print_outline(outline: &Outline) {
    for section in outline {
        println!("{}", section.name);
        for sub in &section.subsections {
            println!("  - {} ({})", sub.name, sub.url);
        }
    }
    let total: usize = outline.iter().map(|s| s.subsections.len()).sum();
    println!();
    println!("{} sections, {} subsections", outline.len(), total);
}
