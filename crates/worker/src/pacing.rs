//! Cooperative pause and pacing waits.
//!
//! Both are suspension points in the orchestrator loop, taken only between
//! work units. A unit that is already running is never interrupted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ringrepair_core::pacing::{remaining_wait, step_budget};
use tokio::time::Instant;

/// Default interval between checks of the pause sentinel.
pub const DEFAULT_PAUSE_POLL: Duration = Duration::from_secs(60);

/// Blocks the run while a sentinel file exists.
///
/// The file's content is never read; only its presence matters. The
/// orchestrator never creates or removes it.
#[derive(Debug, Clone)]
pub struct PauseGate {
    sentinel: PathBuf,
    poll_interval: Duration,
}

impl PauseGate {
    pub fn new(sentinel: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            sentinel: sentinel.into(),
            poll_interval,
        }
    }

    pub fn sentinel(&self) -> &Path {
        &self.sentinel
    }

    /// Whether the sentinel is present right now.
    ///
    /// An unreadable location is treated as "not paused".
    pub async fn is_paused(&self) -> bool {
        match tokio::fs::try_exists(&self.sentinel).await {
            Ok(present) => present,
            Err(e) => {
                tracing::warn!(
                    path = %self.sentinel.display(),
                    error = %e,
                    "Cannot check pause file, continuing unpaused",
                );
                false
            }
        }
    }

    /// Sleep in poll-interval steps until the sentinel disappears.
    ///
    /// Returns how long the run was held.
    pub async fn wait_until_resumed(&self) -> Duration {
        if !self.is_paused().await {
            return Duration::ZERO;
        }

        let start = Instant::now();
        tracing::info!(
            path = %self.sentinel.display(),
            poll_secs = self.poll_interval.as_secs_f64(),
            "Repair paused, waiting for pause file removal",
        );
        loop {
            tokio::time::sleep(self.poll_interval).await;
            if !self.is_paused().await {
                break;
            }
        }

        let held = start.elapsed();
        tracing::info!(paused_secs = held.as_secs(), "Pause file removed, resuming");
        held
    }
}

/// Spreads a total wall-clock budget evenly across work units.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    budget: Duration,
}

impl Pacer {
    /// Pacer for `step_count` units sharing `total_hours`. Non-positive
    /// hours disable pacing.
    pub fn new(total_hours: f64, step_count: usize) -> Self {
        Self {
            budget: step_budget(total_hours, step_count),
        }
    }

    /// Target duration of each unit; zero when unpaced.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_enabled(&self) -> bool {
        !self.budget.is_zero()
    }

    /// Sleep for whatever is left of the unit's budget since `step_start`.
    ///
    /// Returns the time slept.
    pub async fn wait_remainder(&self, step_start: Instant) -> Duration {
        let wait = remaining_wait(self.budget, step_start.elapsed());
        if !wait.is_zero() {
            tracing::info!(
                sleep_secs = wait.as_secs(),
                budget_secs = self.budget.as_secs(),
                "Pacing: sleeping before next step",
            );
            tokio::time::sleep(wait).await;
        }
        wait
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
