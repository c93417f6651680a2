//! JSONL run log — append-only record of what a mirror run did.
//!
//! One line per event, written as it happens, so a crashed run still
//! leaves a usable record next to the files it produced. Log write
//! failures are never allowed to fail the run itself.

use crate::download::DownloadOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Filename of the run log inside the output root.
pub const RUN_LOG_FILENAME: &str = "mirror-log.jsonl";

/// A single run-log event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        base_url: String,
        sections: usize,
    },
    SubsectionSkipped {
        section: String,
        name: String,
    },
    SubsectionHarvested {
        section: String,
        name: String,
        targets: usize,
    },
    Download {
        url: String,
        outcome: String,
    },
    RunFinished {
        summary: RunSummary,
    },
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub sections: usize,
    pub subsections_visited: usize,
    pub subsections_skipped: usize,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub skipped_too_small: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { .. } => self.downloaded += 1,
            DownloadOutcome::SkippedExisting => self.skipped_existing += 1,
            DownloadOutcome::SkippedTooSmall { .. } => self.skipped_too_small += 1,
            DownloadOutcome::Failed => self.failed += 1,
        }
    }
}

/// Append-only JSONL writer scoped to one run.
pub struct RunLog {
    file: File,
    run_id: String,
}

#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: String,
    run_id: &'a str,
    #[serde(flatten)]
    event: &'a RunEvent,
}

impl RunLog {
    /// Open (or create) the log file under the output root.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(RUN_LOG_FILENAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open run log: {}", path.display()))?;

        Ok(Self {
            file,
            run_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Append one event. Failures are logged and swallowed.
    pub fn append(&mut self, event: &RunEvent) {
        let line = LogLine {
            timestamp: Utc::now().to_rfc3339(),
            run_id: &self.run_id,
            event,
        };
        match serde_json::to_string(&line) {
            Ok(json) => {
                if let Err(e) = writeln!(self.file, "{json}") {
                    warn!("run log write failed: {e}");
                }
            }
            Err(e) => warn!("run log serialize failed: {e}"),
        }
    }
}
