//! The repair orchestrator: plan once, then execute unit by unit.
//!
//! A run moves through [`RunPhase`]s:
//!
//! ```text
//! Initializing -> Planning -> Executing -> Finalizing -> Succeeded | Failed
//! ```
//!
//! Any failure while initializing or planning ends the run as `Failed`
//! before a single repair starts. During execution a failed unit is counted
//! against its keyspace and the loop moves on; only the exit status and the
//! summary reflect it.

use ringrepair_core::error::RepairError;
use ringrepair_core::plan::RepairPlan;
use ringrepair_core::retry::RetryPolicy;
use ringrepair_core::status::{progress_message, KeyspaceTally, RunPhase, RunReport};
use ringrepair_core::token::compute_owned_ranges;
use tokio::time::Instant;

use crate::admin::AdminTool;
use crate::executor::RepairExecutor;
use crate::keyspaces::KeyspaceResolver;
use crate::pacing::{Pacer, PauseGate};
use crate::status::StatusReporter;
use crate::topology::TopologyClient;

/// Operator choices for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Repair only this keyspace instead of every non-system one.
    pub keyspace: Option<String>,
    /// Skip address detection and use this address.
    pub local_address: Option<String>,
    /// Total wall-clock budget in hours; `0` runs unpaced.
    pub total_hours: f64,
    /// Pass the primary-range-only flag to each repair.
    pub primary_range_only: bool,
    pub retry: RetryPolicy,
}

pub struct Orchestrator<T> {
    tool: T,
    options: RunOptions,
    pause: PauseGate,
    status: StatusReporter,
}

impl<T: AdminTool> Orchestrator<T> {
    pub fn new(tool: T, options: RunOptions, pause: PauseGate, status: StatusReporter) -> Self {
        Self {
            tool,
            options,
            pause,
            status,
        }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Run to completion and return the terminal report.
    ///
    /// The status file receives a start line, a pause line before each
    /// pause, a progress line after every unit, and a final summary.
    pub async fn run(&self) -> RunReport {
        tracing::info!("--- Starting range repair ---");
        self.status.report("Range repair starting").await;

        let report = match self.plan().await {
            Ok(plan) => self.execute(&plan).await,
            Err(e) => {
                tracing::error!(error = %e, "Repair aborted before execution");
                self.enter(RunPhase::Failed);
                RunReport::aborted(e.to_string())
            }
        };

        let summary = report.summary_message();
        if report.succeeded() {
            tracing::info!(summary = %summary, "--- Range repair finished ---");
        } else {
            tracing::error!(summary = %summary, "--- Range repair finished ---");
        }
        self.status.report(&summary).await;
        report
    }

    /// Initializing and Planning: discover topology and keyspaces and
    /// build the immutable plan.
    pub async fn plan(&self) -> Result<RepairPlan, RepairError> {
        self.enter(RunPhase::Initializing);

        let topology = TopologyClient::new(&self.tool);
        let address = topology
            .discover_local_address(self.options.local_address.as_deref())
            .await?;
        let ring = topology.discover_ring_tokens(&address).await?;
        let keyspaces = KeyspaceResolver::new(&self.tool)
            .resolve(self.options.keyspace.as_deref())
            .await?;

        self.enter(RunPhase::Planning);

        let ranges = compute_owned_ranges(&ring.all, &ring.local);
        let plan = RepairPlan::build(address, keyspaces, ranges)?;

        tracing::info!(
            address = plan.address(),
            keyspaces = plan.keyspaces().len(),
            ranges = plan.ranges().len(),
            units = plan.unit_count(),
            "Repair plan ready",
        );
        Ok(plan)
    }

    /// Executing and Finalizing over an already-built plan.
    pub async fn execute(&self, plan: &RepairPlan) -> RunReport {
        self.enter(RunPhase::Executing);

        let total = plan.unit_count();
        let pacer = Pacer::new(self.options.total_hours, total);
        if pacer.is_enabled() {
            tracing::info!(
                total_hours = self.options.total_hours,
                step_budget_secs = pacer.budget().as_secs(),
                "Pacing enabled",
            );
        }

        let executor = RepairExecutor::new(
            &self.tool,
            self.options.primary_range_only,
            self.options.retry.clone(),
        );
        let mut tallies: Vec<KeyspaceTally> = plan
            .keyspaces()
            .iter()
            .map(|ks| KeyspaceTally::new(ks.as_str(), plan.ranges().len()))
            .collect();
        let mut completed = 0usize;
        let mut failed = 0usize;

        for (index, unit) in plan.units().iter().enumerate() {
            if self.pause.is_paused().await {
                self.status
                    .report(&format!(
                        "Paused after {completed}/{total} steps: waiting for removal of {}",
                        self.pause.sentinel().display()
                    ))
                    .await;
                self.pause.wait_until_resumed().await;
            }

            tracing::info!(
                step = index + 1,
                total,
                keyspace = %unit.keyspace,
                range = %unit.range,
                "--- Repairing range ---",
            );

            let step_start = Instant::now();
            let outcome = executor.execute(unit).await;
            completed += 1;

            if !outcome.is_success() {
                failed += 1;
                tallies[plan.keyspace_index(index)].failed_ranges += 1;
                tracing::warn!(
                    keyspace = %unit.keyspace,
                    range = %unit.range,
                    "Failed to repair a range, continuing with next range",
                );
            }

            self.status
                .report(&progress_message(completed, total, unit, failed))
                .await;

            pacer.wait_remainder(step_start).await;
        }

        self.enter(RunPhase::Finalizing);
        for tally in &tallies {
            if tally.failed_ranges > 0 {
                tracing::error!(
                    keyspace = %tally.keyspace,
                    failed = tally.failed_ranges,
                    total = tally.total_ranges,
                    "Ranges failed to repair for keyspace",
                );
            } else {
                tracing::info!(
                    keyspace = %tally.keyspace,
                    total = tally.total_ranges,
                    "All ranges repaired for keyspace",
                );
            }
        }

        let report = RunReport::finished(total, completed, tallies);
        self.enter(report.phase);
        report
    }

    fn enter(&self, phase: RunPhase) {
        tracing::info!(phase = %phase, "Entering phase");
    }
}
