//! Single-line status file for external monitoring.
//!
//! The file always holds exactly one line, `[<UTC timestamp>] <message>`.
//! Each update is written to a sibling temp file and renamed into place so
//! readers never see a partial line.

use std::path::{Path, PathBuf};

use chrono::Utc;
use ringrepair_core::status::format_status_line;

#[derive(Debug, Clone)]
pub struct StatusReporter {
    path: PathBuf,
}

impl StatusReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the status line with `message`.
    pub async fn write(&self, message: &str) -> std::io::Result<()> {
        let line = format_status_line(Utc::now(), message);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, format!("{line}\n")).await?;
        tokio::fs::rename(&tmp_path, &self.path).await
    }

    /// Like [`Self::write`], but a failed write only logs a warning.
    ///
    /// Status is advisory; an unwritable status file must not stop repairs.
    pub async fn report(&self, message: &str) {
        tracing::debug!(status = message, "Updating status file");
        if let Err(e) = self.write(message).await {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to write status file",
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
