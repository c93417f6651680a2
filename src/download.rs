//! Protected asset download through the live browser session.
//!
//! The target site rejects bare HTTP clients, so bytes are fetched by a
//! script running inside the authenticated page and marshalled out as a
//! base64 data URI. Persistence is idempotent: the same URL always maps
//! to the same filename, and a file already present above the
//! minimum-content threshold is proof of a completed download.

use crate::error::MirrorError;
use crate::paths::image_filename;
use crate::renderer::RenderContext;
use base64::Engine as _;
use std::path::Path;
use tracing::{debug, warn};

/// Prefix a successfully marshalled image payload starts with.
const DATA_URI_IMAGE_PREFIX: &str = "data:image";

/// Prefix the in-page script uses to report a fetch failure.
const ERROR_PREFIX: &str = "ERROR";

/// What happened to one asset. Only the file side effect persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { bytes: usize },
    SkippedExisting,
    SkippedTooSmall { bytes: usize },
    Failed,
}

impl std::fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloaded { .. } => write!(f, "downloaded"),
            Self::SkippedExisting => write!(f, "skipped-existing"),
            Self::SkippedTooSmall { .. } => write!(f, "skipped-too-small"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Downloads one asset at a time through a render context.
pub struct AssetDownloader {
    min_content_bytes: u64,
    fetch_timeout_ms: u64,
}

impl AssetDownloader {
    pub fn new(min_content_bytes: u64, fetch_timeout_ms: u64) -> Self {
        Self {
            min_content_bytes,
            fetch_timeout_ms,
        }
    }

    /// Download one asset into `dest_dir`. Per-URL failures never abort
    /// the run: they are logged and folded into the returned outcome.
    pub async fn download(
        &self,
        ctx: &dyn RenderContext,
        url: &str,
        dest_dir: &Path,
    ) -> DownloadOutcome {
        match self.try_download(ctx, url, dest_dir).await {
            Ok(outcome) => outcome,
            Err(MirrorError::SizeReject { size, min }) => {
                warn!("skip {url}: decoded payload is {size} bytes (< {min})");
                DownloadOutcome::SkippedTooSmall { bytes: size }
            }
            Err(err) => {
                warn!("download failed for {url}: {err}");
                DownloadOutcome::Failed
            }
        }
    }

    async fn try_download(
        &self,
        ctx: &dyn RenderContext,
        url: &str,
        dest_dir: &Path,
    ) -> Result<DownloadOutcome, MirrorError> {
        let filename = image_filename(url);
        let dest = dest_dir.join(&filename);

        if already_downloaded(&dest, self.min_content_bytes) {
            debug!("skip {filename}: already present");
            return Ok(DownloadOutcome::SkippedExisting);
        }

        std::fs::create_dir_all(dest_dir)?;

        let payload = ctx
            .fetch_data_uri(url, self.fetch_timeout_ms)
            .await
            .map_err(|e| MirrorError::Fetch {
                url: url.to_string(),
                reason: format!("{e:#}"),
            })?;

        if payload.starts_with(ERROR_PREFIX) {
            return Err(MirrorError::Fetch {
                url: url.to_string(),
                reason: payload,
            });
        }

        let bytes = decode_image_data_uri(&payload).map_err(|reason| MirrorError::Decode {
            url: url.to_string(),
            reason,
        })?;

        if (bytes.len() as u64) < self.min_content_bytes {
            return Err(MirrorError::SizeReject {
                size: bytes.len(),
                min: self.min_content_bytes,
            });
        }

        std::fs::write(&dest, &bytes)?;
        debug!("wrote {} ({} bytes)", dest.display(), bytes.len());
        Ok(DownloadOutcome::Downloaded { bytes: bytes.len() })
    }
}

/// A file already at the destination and strictly larger than the
/// threshold is proof of a completed download for that URL's filename.
fn already_downloaded(dest: &Path, min_bytes: u64) -> bool {
    std::fs::metadata(dest)
        .map(|meta| meta.len() > min_bytes)
        .unwrap_or(false)
}

/// Split a `data:image/...;base64,` payload into header and body and
/// decode the base64 remainder.
fn decode_image_data_uri(payload: &str) -> Result<Vec<u8>, String> {
    if !payload.starts_with(DATA_URI_IMAGE_PREFIX) {
        return Err("missing data:image prefix".to_string());
    }
    let (_, encoded) = payload
        .split_once(',')
        .ok_or_else(|| "no comma separator in data URI".to_string())?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| format!("base64 decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Context stub returning a fixed payload for every in-page fetch.
    struct StubContext {
        payload: String,
        fetches: Arc<AtomicUsize>,
    }

    impl StubContext {
        fn new(payload: impl Into<String>) -> Self {
            Self {
                payload: payload.into(),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl RenderContext for StubContext {
        async fn navigate(&mut self, _url: &str, _timeout_ms: u64) -> Result<()> {
            Ok(())
        }
        async fn settle(&self) -> Result<()> {
            Ok(())
        }
        async fn html(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn fetch_data_uri(&self, _url: &str, _timeout_ms: u64) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn data_uri(len: usize) -> String {
        let bytes = vec![0xAB_u8; len];
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[tokio::test]
    async fn test_downloads_payload_above_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StubContext::new(data_uri(1500));
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/skin-01.jpg", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::Downloaded { bytes: 1500 });
        let written = std::fs::read(dir.path().join("skin-01.jpg")).unwrap();
        assert_eq!(written.len(), 1500);
    }

    #[tokio::test]
    async fn test_skips_existing_file_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("skin-01.jpg"), vec![0u8; 2000]).unwrap();

        let ctx = StubContext::new(data_uri(1500));
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/skin-01.jpg", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::SkippedExisting);
        assert_eq!(ctx.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_small_existing_file_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        // A 100-byte remnant does not count as a completed download.
        std::fs::write(dir.path().join("skin-01.jpg"), vec![0u8; 100]).unwrap();

        let ctx = StubContext::new(data_uri(1500));
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/skin-01.jpg", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::Downloaded { bytes: 1500 });
        assert_eq!(ctx.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_payload_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StubContext::new("ERROR: Network response was not ok");
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/skin-01.jpg", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::Failed);
        assert!(!dir.path().join("skin-01.jpg").exists());
    }

    #[tokio::test]
    async fn test_payload_below_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StubContext::new(data_uri(500));
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/skin-01.jpg", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::SkippedTooSmall { bytes: 500 });
        assert!(!dir.path().join("skin-01.jpg").exists());
    }

    #[tokio::test]
    async fn test_non_image_payload_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StubContext::new("data:text/html;base64,PGh0bWw+");
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/skin-01.jpg", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::Failed);
        assert!(!dir.path().join("skin-01.jpg").exists());
    }

    #[tokio::test]
    async fn test_malformed_base64_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StubContext::new("data:image/jpeg;base64,!!!not-base64!!!");
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/skin-01.jpg", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::Failed);
    }

    #[tokio::test]
    async fn test_filename_falls_back_for_bare_directory_url() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StubContext::new(data_uri(1200));
        let downloader = AssetDownloader::new(1000, 5000);

        let outcome = downloader
            .download(&ctx, "https://site.test/plates/", dir.path())
            .await;

        assert_eq!(outcome, DownloadOutcome::Downloaded { bytes: 1200 });
        assert!(dir.path().join("index.jpg").exists());
    }

    #[test]
    fn test_decode_splits_header_and_payload() {
        let bytes = decode_image_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_outcome_display_names() {
        assert_eq!(DownloadOutcome::Downloaded { bytes: 1 }.to_string(), "downloaded");
        assert_eq!(DownloadOutcome::SkippedExisting.to_string(), "skipped-existing");
        assert_eq!(
            DownloadOutcome::SkippedTooSmall { bytes: 1 }.to_string(),
            "skipped-too-small"
        );
        assert_eq!(DownloadOutcome::Failed.to_string(), "failed");
    }
}
