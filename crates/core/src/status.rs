//! Run phases, the status-line format, and the end-of-run report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::plan::WorkUnit;

/// Timestamp format used inside the status line brackets.
pub const STATUS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Lifecycle of a single orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Initializing,
    Planning,
    Executing,
    Finalizing,
    Succeeded,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Finalizing => "finalizing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render `[<timestamp>] <message>` as a single line.
///
/// Line breaks inside `message` are folded into spaces so readers always see
/// exactly one line.
pub fn format_status_line(at: DateTime<Utc>, message: &str) -> String {
    let flat: Vec<&str> = message.split(['\r', '\n']).filter(|s| !s.is_empty()).collect();
    format!("[{}] {}", at.format(STATUS_TIMESTAMP_FORMAT), flat.join(" "))
}

/// Status message written after each completed unit.
pub fn progress_message(completed: usize, total: usize, unit: &WorkUnit, failed: usize) -> String {
    let mut msg = format!(
        "{completed}/{total} steps complete (last: keyspace '{}' range {})",
        unit.keyspace, unit.range
    );
    if failed > 0 {
        msg.push_str(&format!(", {failed} failed so far"));
    }
    msg
}

/// Failure count for one keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyspaceTally {
    pub keyspace: String,
    pub total_ranges: usize,
    pub failed_ranges: usize,
}

impl KeyspaceTally {
    pub fn new(keyspace: impl Into<String>, total_ranges: usize) -> Self {
        Self {
            keyspace: keyspace.into(),
            total_ranges,
            failed_ranges: 0,
        }
    }
}

/// Outcome of a whole run, produced once the orchestrator reaches a
/// terminal phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub phase: RunPhase,
    pub total_units: usize,
    pub completed_units: usize,
    pub failed_units: usize,
    pub keyspaces: Vec<KeyspaceTally>,
    /// Set when the run was aborted before executing.
    pub cause: Option<String>,
}

impl RunReport {
    /// A run that never reached execution.
    pub fn aborted(cause: impl Into<String>) -> Self {
        Self {
            phase: RunPhase::Failed,
            total_units: 0,
            completed_units: 0,
            failed_units: 0,
            keyspaces: Vec::new(),
            cause: Some(cause.into()),
        }
    }

    /// Aggregate per-keyspace tallies into a terminal report.
    pub fn finished(total_units: usize, completed_units: usize, keyspaces: Vec<KeyspaceTally>) -> Self {
        let failed_units = keyspaces.iter().map(|k| k.failed_ranges).sum();
        let phase = if failed_units == 0 && completed_units == total_units {
            RunPhase::Succeeded
        } else {
            RunPhase::Failed
        };
        Self {
            phase,
            total_units,
            completed_units,
            failed_units,
            keyspaces,
            cause: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.phase == RunPhase::Succeeded
    }

    /// Process exit code: 0 only for a fully successful run.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    /// Keyspaces with at least one failed range.
    pub fn failed_keyspaces(&self) -> Vec<&str> {
        self.keyspaces
            .iter()
            .filter(|k| k.failed_ranges > 0)
            .map(|k| k.keyspace.as_str())
            .collect()
    }

    /// Final human-readable summary for the status line.
    pub fn summary_message(&self) -> String {
        if let Some(cause) = &self.cause {
            return format!("Repair FAILED before execution: {cause}");
        }
        if self.succeeded() {
            return format!(
                "Repair SUCCEEDED: {}/{} steps complete across {} keyspace(s)",
                self.completed_units,
                self.total_units,
                self.keyspaces.len()
            );
        }
        let failed = self.failed_keyspaces();
        format!(
            "Repair FAILED: {} of {} steps failed in {} keyspace(s) ({})",
            self.failed_units,
            self.total_units,
            failed.len(),
            failed.join(", ")
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
