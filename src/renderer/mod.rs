//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The live,
//! operator-authenticated session is the only network path: pages render
//! through it and assets are fetched from inside it, so the rest of the
//! pipeline never issues a bare HTTP request the target site could
//! fingerprint.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
}

/// A single browser context (tab). One context services one mirror run,
/// strictly sequentially.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;
    /// Scroll to the bottom of the page so lazily loaded media enters
    /// the DOM.
    async fn settle(&self) -> Result<()>;
    /// Get the full page HTML.
    async fn html(&self) -> Result<String>;
    /// Fetch `url` from inside the authenticated page, using the
    /// session's live cookies, and return the payload marshalled as a
    /// base64 data URI. The page script resolves to an `"ERROR: "`
    /// prefixed string when the fetch itself fails.
    async fn fetch_data_uri(&self, url: &str, timeout_ms: u64) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
