//! Orchestration: discover the outline once, then harvest and download
//! subsection by subsection through a single browser session.
//!
//! Deliberately sequential: one session, one request at a time, so the
//! anti-bot fingerprint stays small and resumability stays a per-folder
//! check. Per-URL and per-subsection failures are recovered in the loops;
//! only a discovery failure or a broken session aborts the run.

use crate::config::MirrorConfig;
use crate::download::AssetDownloader;
use crate::error::MirrorError;
use crate::harvest;
use crate::outline::{self, Outline, Section, Subsection};
use crate::paths::{has_image_extension, subsection_dir};
use crate::renderer::RenderContext;
use crate::report::{RunEvent, RunLog, RunSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Blocks the run until the operator signals the landing page is ready
/// (bot challenge solved, content visible). The sole operator-facing
/// interface of a run.
#[async_trait]
pub trait ReadyGate: Send + Sync {
    async fn wait_ready(&self) -> Result<()>;
}

/// Gate that never waits, for unattended and test runs.
pub struct NoGate;

#[async_trait]
impl ReadyGate for NoGate {
    async fn wait_ready(&self) -> Result<()> {
        Ok(())
    }
}

/// Drives one full mirror run.
pub struct Mirror {
    config: MirrorConfig,
    downloader: AssetDownloader,
}

impl Mirror {
    pub fn new(config: MirrorConfig) -> Self {
        let downloader =
            AssetDownloader::new(config.min_content_bytes, config.fetch_timeout_ms);
        Self { config, downloader }
    }

    /// Navigate to the landing page, wait for the operator, and infer the
    /// section outline. The outline is read-only for the rest of the run.
    pub async fn discover(
        &self,
        ctx: &mut dyn RenderContext,
        gate: &dyn ReadyGate,
    ) -> Result<Outline> {
        let base = Url::parse(&self.config.base_url).context("invalid base URL")?;

        ctx.navigate(base.as_str(), self.config.nav_timeout_ms)
            .await
            .map_err(|e| MirrorError::Session(format!("{e:#}")))?;

        gate.wait_ready().await?;

        let html = ctx
            .html()
            .await
            .map_err(|e| MirrorError::Session(format!("{e:#}")))?;

        let outline = outline::discover(
            &html,
            &base,
            &self.config.heading_stoplist,
            &self.config.overrides,
        )?;
        info!(
            "discovered {} sections ({} subsections)",
            outline.len(),
            outline.iter().map(|s| s.subsections.len()).sum::<usize>()
        );
        Ok(outline)
    }

    pub async fn run(
        &self,
        ctx: &mut dyn RenderContext,
        gate: &dyn ReadyGate,
    ) -> Result<RunSummary> {
        let outline = self.discover(ctx, gate).await?;

        let mut log = RunLog::create(&self.config.output_root)?;
        log.append(&RunEvent::RunStarted {
            base_url: self.config.base_url.clone(),
            sections: outline.len(),
        });

        let mut summary = RunSummary {
            sections: outline.len(),
            ..Default::default()
        };

        for section in &outline {
            info!("section: {}", section.name);

            for sub in &section.subsections {
                let target_dir =
                    subsection_dir(&self.config.output_root, &section.name, &sub.name);

                if has_existing_images(&target_dir) {
                    info!("  resume: skipping {} (already populated)", sub.name);
                    summary.subsections_skipped += 1;
                    log.append(&RunEvent::SubsectionSkipped {
                        section: section.name.clone(),
                        name: sub.name.clone(),
                    });
                    continue;
                }

                info!("  subsection: {} ({})", sub.name, sub.url);
                if let Err(err) = self
                    .mirror_subsection(ctx, &mut log, &mut summary, section, sub, &target_dir)
                    .await
                {
                    warn!("  subsection {} failed: {err:#}", sub.name);
                }
                summary.subsections_visited += 1;

                // Pace requests between subsection visits.
                tokio::time::sleep(Duration::from_millis(self.config.subsection_delay_ms)).await;
            }
        }

        log.append(&RunEvent::RunFinished {
            summary: summary.clone(),
        });
        info!(
            "run finished: {} downloaded, {} already present, {} too small, {} failed",
            summary.downloaded, summary.skipped_existing, summary.skipped_too_small, summary.failed
        );
        Ok(summary)
    }

    async fn mirror_subsection(
        &self,
        ctx: &mut dyn RenderContext,
        log: &mut RunLog,
        summary: &mut RunSummary,
        section: &Section,
        sub: &Subsection,
        target_dir: &Path,
    ) -> Result<()> {
        let page_url = Url::parse(&sub.url).context("invalid subsection URL")?;

        ctx.navigate(page_url.as_str(), self.config.nav_timeout_ms)
            .await?;
        ctx.settle().await?;
        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        let html = ctx.html().await?;
        let targets = match harvest::harvest_targets(&html, &page_url) {
            Ok(targets) => targets,
            Err(err @ MirrorError::EmptyHarvest { .. }) => {
                warn!("  {err}");
                log.append(&RunEvent::SubsectionHarvested {
                    section: section.name.clone(),
                    name: sub.name.clone(),
                    targets: 0,
                });
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        info!("  found {} image targets", targets.len());
        log.append(&RunEvent::SubsectionHarvested {
            section: section.name.clone(),
            name: sub.name.clone(),
            targets: targets.len(),
        });

        for url in &targets {
            let outcome = self.downloader.download(ctx, url, target_dir).await;
            summary.record(&outcome);
            log.append(&RunEvent::Download {
                url: url.clone(),
                outcome: outcome.to_string(),
            });
        }
        Ok(())
    }
}

/// Resume check: a destination folder that already contains at least one
/// recognized image file is treated as fully mirrored.
fn has_existing_images(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry
            .file_name()
            .to_str()
            .map(has_image_extension)
            .unwrap_or(false)
    })
}
