//! Pure domain logic for paced, range-by-range repair of a single node.
//!
//! Nothing in this crate spawns processes or touches the filesystem. The
//! worker crate feeds it raw listings from the administrative tool and
//! drives the resulting [`plan::RepairPlan`].

pub mod error;
pub mod keyspace;
pub mod pacing;
pub mod plan;
pub mod retry;
pub mod status;
pub mod token;
pub mod topology;
