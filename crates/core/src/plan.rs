//! The repair plan: every (keyspace, range) pair, keyspace-major.

use std::fmt;

use serde::Serialize;

use crate::error::RepairError;
use crate::token::TokenRange;

/// The atomic unit of execution: one range of one keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkUnit {
    pub keyspace: String,
    pub range: TokenRange,
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyspace, self.range)
    }
}

/// Immutable ordered sequence of [`WorkUnit`]s for one node.
///
/// Units are ordered keyspace-major: all ranges of the first keyspace, then
/// all ranges of the second, and so on. Range order is preserved exactly as
/// given.
#[derive(Debug, Clone, Serialize)]
pub struct RepairPlan {
    address: String,
    keyspaces: Vec<String>,
    ranges: Vec<TokenRange>,
    units: Vec<WorkUnit>,
}

impl RepairPlan {
    /// Build the plan for `address`.
    ///
    /// Fails with [`RepairError::EmptyPlan`] when no ranges are owned and
    /// [`RepairError::NoKeyspaces`] when no keyspace was selected.
    pub fn build(
        address: impl Into<String>,
        keyspaces: Vec<String>,
        ranges: Vec<TokenRange>,
    ) -> Result<Self, RepairError> {
        let address = address.into();
        if ranges.is_empty() {
            return Err(RepairError::EmptyPlan { address });
        }
        if keyspaces.is_empty() {
            return Err(RepairError::NoKeyspaces);
        }

        let units = keyspaces
            .iter()
            .flat_map(|ks| {
                ranges.iter().map(move |range| WorkUnit {
                    keyspace: ks.clone(),
                    range: *range,
                })
            })
            .collect();

        Ok(Self {
            address,
            keyspaces,
            ranges,
            units,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn keyspaces(&self) -> &[String] {
        &self.keyspaces
    }

    pub fn ranges(&self) -> &[TokenRange] {
        &self.ranges
    }

    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    /// Number of work units; never zero for a built plan.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Index into [`Self::keyspaces`] of the unit at `unit_index`.
    pub fn keyspace_index(&self, unit_index: usize) -> usize {
        unit_index / self.ranges.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
