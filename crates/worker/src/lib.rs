//! `ringrepair-worker` library crate.
//!
//! Everything the `range-repair` binary needs to repair one node's token
//! ranges a slice at a time: the administrative tool seam, topology
//! discovery, pause/pacing control, status reporting, and the orchestrator
//! loop. Re-exported for integration testing; the binary entrypoint lives
//! in `main.rs`.

pub mod admin;
pub mod config;
pub mod executor;
pub mod keyspaces;
pub mod orchestrator;
pub mod pacing;
pub mod status;
pub mod topology;
