//! Error taxonomy for the mirroring pipeline.
//!
//! Only `Discovery` and `Session` abort a run; everything else is
//! recovered locally by the orchestrator loops.

/// Errors raised by the discovery, harvest, and download stages.
#[derive(thiserror::Error, Debug)]
pub enum MirrorError {
    /// The landing page had no usable content region, or discovery plus
    /// overrides produced an empty outline. Fatal: the run has nothing
    /// to iterate.
    #[error("no section structure could be discovered from the landing page")]
    Discovery,

    /// A subsection page yielded zero candidate image targets.
    #[error("no image targets found on {url}")]
    EmptyHarvest { url: String },

    /// The in-page fetch reported a non-successful response, a script
    /// failure, or exceeded its deadline.
    #[error("in-page fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The marshalled payload is not a well-formed image data URI.
    #[error("payload for {url} is not a decodable image: {reason}")]
    Decode { url: String, reason: String },

    /// The decoded payload is below the minimum-content threshold and is
    /// treated as a placeholder or broken image.
    #[error("decoded payload is {size} bytes, below the {min} byte minimum")]
    SizeReject { size: usize, min: u64 },

    /// The browser session itself failed. Fatal when it hits the
    /// orchestrator's outer flow.
    #[error("browser session error: {0}")]
    Session(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
