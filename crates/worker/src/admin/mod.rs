//! The administrative tool seam.
//!
//! The orchestrator only ever talks to the cluster through [`AdminTool`]:
//! status, ring, and keyspace listings plus a scoped repair. The production
//! implementation is [`NodetoolClient`], which shells out to `nodetool`;
//! tests substitute an in-memory fake.

pub mod nodetool;
mod subprocess;

use std::fmt;
use std::time::Duration;

use ringrepair_core::plan::WorkUnit;
use ringrepair_core::token::TokenRange;
use ringrepair_core::topology::{NodeStatusRow, RingEntry};

pub use nodetool::{Credentials, NodetoolClient};

/// One repair invocation: a single range of a single keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairRequest {
    pub keyspace: String,
    pub range: TokenRange,
    /// Restrict the repair to ranges this node is the primary replica for.
    pub primary_range_only: bool,
}

impl RepairRequest {
    pub fn for_unit(unit: &WorkUnit, primary_range_only: bool) -> Self {
        Self {
            keyspace: unit.keyspace.clone(),
            range: unit.range,
            primary_range_only,
        }
    }
}

/// Errors that can occur while invoking the administrative tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool's executable could not be found.
    #[error("{program} not found")]
    NotFound { program: String },

    /// The process could not be started for another reason.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited unsuccessfully.
    #[error("`{command}` exited with code {exit_code}{}", detail_suffix(.detail))]
    NonZeroExit {
        command: String,
        /// `-1` if the process was killed by a signal.
        exit_code: i32,
        detail: String,
    },

    /// The process exceeded its time limit and was killed.
    #[error("`{command}` timed out after {}s", .elapsed.as_secs())]
    Timeout { command: String, elapsed: Duration },

    /// An I/O error occurred while waiting on the process.
    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

/// Capability interface over the cluster's administrative tool.
///
/// Implementations may use process invocation, RPC, or a native client; the
/// orchestrator only depends on this trait.
pub trait AdminTool: Send + Sync {
    /// Node rows from the cluster status listing.
    fn query_status(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<NodeStatusRow>, ToolError>> + Send;

    /// Address/token rows from the ring listing.
    fn query_ring(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<RingEntry>, ToolError>> + Send;

    /// Every keyspace name known to the cluster, system ones included.
    fn query_keyspaces(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, ToolError>> + Send;

    /// Repair one range of one keyspace, surfacing the tool's output to the
    /// log as it is produced.
    fn run_repair(
        &self,
        request: &RepairRequest,
    ) -> impl std::future::Future<Output = Result<(), ToolError>> + Send;
}

/// Display helper for a command line that never includes credentials.
pub(crate) struct CommandLine<'a> {
    pub program: &'a str,
    pub args: &'a [String],
}

impl fmt::Display for CommandLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program)?;
        for arg in self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ringrepair_core::token::Token;

    use super::*;

    #[test]
    fn display_not_found() {
        let err = ToolError::NotFound {
            program: "nodetool".to_string(),
        };
        assert_eq!(err.to_string(), "nodetool not found");
    }

    #[test]
    fn display_non_zero_exit_with_detail() {
        let err = ToolError::NonZeroExit {
            command: "nodetool ring".to_string(),
            exit_code: 2,
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`nodetool ring` exited with code 2: connection refused"
        );
    }

    #[test]
    fn display_non_zero_exit_without_detail() {
        let err = ToolError::NonZeroExit {
            command: "nodetool repair".to_string(),
            exit_code: 1,
            detail: String::new(),
        };
        assert_eq!(err.to_string(), "`nodetool repair` exited with code 1");
    }

    #[test]
    fn display_timeout() {
        let err = ToolError::Timeout {
            command: "nodetool repair".to_string(),
            elapsed: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "`nodetool repair` timed out after 90s");
    }

    #[test]
    fn spawn_error_has_source() {
        let err = ToolError::Spawn {
            program: "nodetool".to_string(),
            source: std::io::Error::other("boom"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn request_from_unit() {
        let unit = WorkUnit {
            keyspace: "orders".into(),
            range: TokenRange::new(Token(1), Token(2)),
        };
        let req = RepairRequest::for_unit(&unit, true);
        assert_eq!(req.keyspace, "orders");
        assert_eq!(req.range, unit.range);
        assert!(req.primary_range_only);
    }

    #[test]
    fn command_line_display() {
        let args = vec!["repair".to_string(), "-st".to_string(), "5".to_string()];
        let line = CommandLine {
            program: "nodetool",
            args: &args,
        };
        assert_eq!(line.to_string(), "nodetool repair -st 5");
    }
}
