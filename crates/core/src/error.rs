/// Fatal conditions that end a repair run before any unit executes.
///
/// A single failed unit is not an error at this level; see
/// [`crate::status::RunReport`] for how unit failures are counted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepairError {
    #[error("Topology unavailable: {0}")]
    TopologyUnavailable(String),

    #[error("No keyspaces to repair")]
    NoKeyspaces,

    #[error("No token ranges owned by {address}")]
    EmptyPlan { address: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
