//! `vitrine mirror <url>` — mirror a gallery site into a local tree.

use crate::config::{self, MirrorConfig};
use crate::mirror::{Mirror, ReadyGate};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Waits for the operator to press Enter after solving any bot challenge
/// in the visible browser window.
pub struct StdinGate;

#[async_trait]
impl ReadyGate for StdinGate {
    async fn wait_ready(&self) -> Result<()> {
        println!();
        println!("  ==================================================");
        println!("  ACTION REQUIRED");
        println!("  Solve any bot challenge in the browser window and");
        println!("  make sure the landing page is fully visible.");
        println!("  ==================================================");
        println!();
        println!("  Press Enter here once the page is ready...");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("failed to read operator confirmation")?;
        Ok(())
    }
}

/// Assemble the run configuration from CLI flags.
pub fn build_config(
    url: &str,
    out: &Path,
    overrides: Option<&Path>,
    skip_headings: &[String],
    delay_ms: u64,
    min_bytes: u64,
    timeout_ms: u64,
) -> Result<MirrorConfig> {
    let mut config = MirrorConfig::new(url, out);
    config.subsection_delay_ms = delay_ms;
    config.min_content_bytes = min_bytes;
    config.nav_timeout_ms = timeout_ms;
    config.fetch_timeout_ms = timeout_ms;
    config.heading_stoplist = skip_headings.to_vec();
    if let Some(path) = overrides {
        config.overrides = config::load_overrides(path)?;
    }
    Ok(config)
}

/// Run the mirror command.
pub async fn run(
    url: &str,
    out: &Path,
    overrides: Option<&Path>,
    skip_headings: &[String],
    delay_ms: u64,
    min_bytes: u64,
    timeout_ms: u64,
) -> Result<()> {
    let config = build_config(
        url,
        out,
        overrides,
        skip_headings,
        delay_ms,
        min_bytes,
        timeout_ms,
    )?;

    let renderer = ChromiumRenderer::new().await?;
    let mut ctx = renderer.new_context().await?;

    // Run, then tear the session down whatever the outcome.
    let result = Mirror::new(config).run(ctx.as_mut(), &StdinGate).await;

    if let Err(e) = ctx.close().await {
        warn!("context close failed: {e:#}");
    }
    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }

    let summary = result?;
    println!();
    println!(
        "  Mirrored {} sections: {} downloaded, {} already present, {} too small, {} failed ({} subsections resumed)",
        summary.sections,
        summary.downloaded,
        summary.skipped_existing,
        summary.skipped_too_small,
        summary.failed,
        summary.subsections_skipped,
    );
    Ok(())
}
