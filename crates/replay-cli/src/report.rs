//! JSON report of a finished run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use replay_runner::ReplaySummary;

use crate::{HarnessConfig, HarnessError};

/// What `--report` writes.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Contract fixture that was replayed.
    pub contract: &'a Path,
    /// Interface document used for validation.
    pub schema: &'a Path,
    /// True when every interaction passed.
    pub all_passed: bool,
    /// Counts and per-interaction outcomes.
    pub summary: &'a ReplaySummary,
}

impl<'a> Report<'a> {
    /// Report for `summary`, stamped now.
    pub fn new(config: &'a HarnessConfig, summary: &'a ReplaySummary) -> Self {
        Self {
            generated_at: Utc::now(),
            contract: &config.contract,
            schema: &config.schema,
            all_passed: summary.all_passed(),
            summary,
        }
    }

    /// Write as pretty JSON to `path`.
    pub fn write(&self, path: &Path) -> Result<(), HarnessError> {
        let fail = |reason: String| HarnessError::Report {
            path: PathBuf::from(path),
            reason,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| fail(e.to_string()))?;
        std::fs::write(path, json + "\n").map_err(|e| fail(e.to_string()))?;
        tracing::info!(path = %path.display(), "report written");
        Ok(())
    }
}
