//! Runs a single work unit and classifies its outcome.

use ringrepair_core::plan::WorkUnit;
use ringrepair_core::retry::RetryPolicy;
use tracing::Instrument;

use crate::admin::{AdminTool, RepairRequest};

/// Result of one work unit. There is no partial success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, error: String },
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Invokes the administrative tool's repair for one unit at a time.
///
/// A failed invocation is retried only as far as the [`RetryPolicy`]
/// allows; the default policy runs each unit once.
pub struct RepairExecutor<'a, T> {
    tool: &'a T,
    primary_range_only: bool,
    retry: RetryPolicy,
}

impl<'a, T: AdminTool> RepairExecutor<'a, T> {
    pub fn new(tool: &'a T, primary_range_only: bool, retry: RetryPolicy) -> Self {
        Self {
            tool,
            primary_range_only,
            retry,
        }
    }

    /// Repair `unit`, returning its classified outcome. Never errors: any
    /// failure to start or complete the repair becomes
    /// [`UnitOutcome::Failed`].
    pub async fn execute(&self, unit: &WorkUnit) -> UnitOutcome {
        let span = tracing::info_span!(
            "repair_unit",
            keyspace = %unit.keyspace,
            range = %unit.range,
        );
        self.execute_with_retries(unit).instrument(span).await
    }

    async fn execute_with_retries(&self, unit: &WorkUnit) -> UnitOutcome {
        let request = RepairRequest::for_unit(unit, self.primary_range_only);
        let mut delays = self.retry.delays();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let error = match self.tool.run_repair(&request).await {
                Ok(()) => {
                    tracing::info!(attempts, "Range repaired");
                    return UnitOutcome::Succeeded { attempts };
                }
                Err(e) => e.to_string(),
            };

            match delays.next() {
                Some(delay) => {
                    tracing::warn!(
                        attempts,
                        error = %error,
                        retry_in_secs = delay.as_secs(),
                        "Range repair failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!(attempts, error = %error, "Range repair failed");
                    return UnitOutcome::Failed { attempts, error };
                }
            }
        }
    }
}
