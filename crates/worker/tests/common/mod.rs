//! Shared fixtures for orchestrator integration tests.
//!
//! [`FakeTool`] stands in for `nodetool`: canned status, ring, and keyspace
//! listings, scripted repair failures, and a record of every repair call.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ringrepair_core::token::{Token, TokenRange};
use ringrepair_core::topology::{NodeStatusRow, RingEntry};
use ringrepair_worker::admin::{AdminTool, RepairRequest, ToolError};
use ringrepair_worker::orchestrator::{Orchestrator, RunOptions};
use ringrepair_worker::pacing::PauseGate;
use ringrepair_worker::status::StatusReporter;
use tokio::time::Instant;

pub const LOCAL: &str = "192.0.2.1";
pub const PEER: &str = "192.0.2.2";

/// One observed repair invocation.
#[derive(Debug, Clone)]
pub struct RepairCall {
    pub keyspace: String,
    pub range: TokenRange,
    pub primary_range_only: bool,
    pub at: Instant,
    /// Status file content at the moment the repair started.
    pub status_line: Option<String>,
}

pub struct FakeTool {
    status: Result<Vec<NodeStatusRow>, String>,
    ring: Vec<RingEntry>,
    keyspaces: Vec<String>,
    failing: HashSet<(String, i128)>,
    failing_attempts: usize,
    repair_duration: Duration,
    status_capture: Option<PathBuf>,
    pause_on_first_repair: Option<PathBuf>,
    calls: Mutex<Vec<RepairCall>>,
    status_queries: AtomicUsize,
    keyspace_queries: AtomicUsize,
}

impl Default for FakeTool {
    /// Two nodes, two tokens each, local owns `(400, 100]` and `(200, 300]`.
    /// Keyspaces `orders` and `users` plus two system keyspaces.
    fn default() -> Self {
        Self {
            status: Ok(vec![status_row("UN", LOCAL)]),
            ring: vec![
                ring_entry(LOCAL, 100),
                ring_entry(PEER, 200),
                ring_entry(LOCAL, 300),
                ring_entry(PEER, 400),
            ],
            keyspaces: vec![
                "system".to_string(),
                "orders".to_string(),
                "system_auth".to_string(),
                "users".to_string(),
            ],
            failing: HashSet::new(),
            failing_attempts: 0,
            repair_duration: Duration::ZERO,
            status_capture: None,
            pause_on_first_repair: None,
            calls: Mutex::new(Vec::new()),
            status_queries: AtomicUsize::new(0),
            keyspace_queries: AtomicUsize::new(0),
        }
    }
}

impl FakeTool {
    pub fn with_status_rows(mut self, rows: Vec<NodeStatusRow>) -> Self {
        self.status = Ok(rows);
        self
    }

    pub fn with_status_failure(mut self, message: &str) -> Self {
        self.status = Err(message.to_string());
        self
    }

    pub fn with_keyspaces(mut self, keyspaces: &[&str]) -> Self {
        self.keyspaces = keyspaces.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every attempt at `keyspace` / range ending at `end` fails.
    pub fn failing_unit(mut self, keyspace: &str, end: i128) -> Self {
        self.failing.insert((keyspace.to_string(), end));
        self
    }

    /// The first `n` repair attempts fail regardless of unit.
    pub fn failing_first_attempts(mut self, n: usize) -> Self {
        self.failing_attempts = n;
        self
    }

    pub fn with_repair_duration(mut self, duration: Duration) -> Self {
        self.repair_duration = duration;
        self
    }

    /// Capture this status file's content at the start of every repair.
    pub fn capturing_status(mut self, path: &Path) -> Self {
        self.status_capture = Some(path.to_path_buf());
        self
    }

    /// Create `sentinel` while the first repair runs.
    pub fn pausing_on_first_repair(mut self, sentinel: &Path) -> Self {
        self.pause_on_first_repair = Some(sentinel.to_path_buf());
        self
    }

    pub fn calls(&self) -> Vec<RepairCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    pub fn keyspace_queries(&self) -> usize {
        self.keyspace_queries.load(Ordering::SeqCst)
    }

    fn record(&self, request: &RepairRequest) -> usize {
        let status_line = self
            .status_capture
            .as_ref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .map(|s| s.trim_end().to_string());

        let mut calls = self.calls.lock().expect("calls lock");
        calls.push(RepairCall {
            keyspace: request.keyspace.clone(),
            range: request.range,
            primary_range_only: request.primary_range_only,
            at: Instant::now(),
            status_line,
        });
        calls.len()
    }
}

impl AdminTool for FakeTool {
    async fn query_status(&self) -> Result<Vec<NodeStatusRow>, ToolError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.status.clone().map_err(|detail| ToolError::NonZeroExit {
            command: "nodetool status".to_string(),
            exit_code: 1,
            detail,
        })
    }

    async fn query_ring(&self) -> Result<Vec<RingEntry>, ToolError> {
        Ok(self.ring.clone())
    }

    async fn query_keyspaces(&self) -> Result<Vec<String>, ToolError> {
        self.keyspace_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.keyspaces.clone())
    }

    async fn run_repair(&self, request: &RepairRequest) -> Result<(), ToolError> {
        let call_number = self.record(request);

        if call_number == 1 {
            if let Some(sentinel) = &self.pause_on_first_repair {
                std::fs::write(sentinel, b"").expect("create pause sentinel");
            }
        }

        if !self.repair_duration.is_zero() {
            tokio::time::sleep(self.repair_duration).await;
        }

        let scripted = self
            .failing
            .contains(&(request.keyspace.clone(), request.range.end.0));
        if scripted || call_number <= self.failing_attempts {
            return Err(ToolError::NonZeroExit {
                command: format!("nodetool repair {}", request.keyspace),
                exit_code: 2,
                detail: "Repair session failed".to_string(),
            });
        }
        Ok(())
    }
}

pub fn status_row(state: &str, address: &str) -> NodeStatusRow {
    NodeStatusRow {
        state: state.to_string(),
        address: address.to_string(),
    }
}

pub fn ring_entry(address: &str, token: i128) -> RingEntry {
    RingEntry {
        address: address.to_string(),
        token: Token(token),
    }
}

pub fn range(start: i128, end: i128) -> TokenRange {
    TokenRange::new(Token(start), Token(end))
}

/// Pause and status files inside a fresh temp directory.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn pause_file(&self) -> PathBuf {
        self.dir.path().join("range_repair.pause")
    }

    pub fn status_file(&self) -> PathBuf {
        self.dir.path().join("range_repair.status")
    }

    pub fn status_line(&self) -> String {
        std::fs::read_to_string(self.status_file())
            .expect("status file written")
            .trim_end()
            .to_string()
    }

    pub fn orchestrator(&self, tool: FakeTool, options: RunOptions) -> Orchestrator<FakeTool> {
        self.orchestrator_with_poll(tool, options, Duration::from_secs(60))
    }

    pub fn orchestrator_with_poll(
        &self,
        tool: FakeTool,
        options: RunOptions,
        poll: Duration,
    ) -> Orchestrator<FakeTool> {
        Orchestrator::new(
            tool,
            options,
            PauseGate::new(self.pause_file(), poll),
            StatusReporter::new(self.status_file()),
        )
    }
}
