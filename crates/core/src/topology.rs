//! Parsers for the administrative tool's node status and ring listings.
//!
//! Both listings are human-oriented tables with headers, separators, and
//! datacenter banners mixed in. Rows that do not look like data are skipped
//! rather than failing the whole parse.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::RepairError;
use crate::token::Token;

/// A status row begins with a two-letter state code such as `UN` or `DL`,
/// followed by the node address.
static STATUS_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([UD][NLJM])\s+(\S+)").expect("valid regex"));

/// Minimum whitespace-separated columns in a ring data row
/// (address, rack, status, state, load, owns, token).
pub const MIN_RING_COLUMNS: usize = 7;

/// One node row from the status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatusRow {
    /// Two-letter state code, e.g. `UN` (up, normal).
    pub state: String,
    pub address: String,
}

impl NodeStatusRow {
    pub fn is_up(&self) -> bool {
        self.state.starts_with('U')
    }
}

/// One token row from the ring listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingEntry {
    pub address: String,
    pub token: Token,
}

/// Every token on the ring, plus the subset owned by the local node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingTokens {
    pub all: Vec<Token>,
    pub local: Vec<Token>,
}

/// Extract node rows from a status listing.
pub fn parse_status(output: &str) -> Vec<NodeStatusRow> {
    output
        .lines()
        .filter_map(|line| {
            let caps = STATUS_ROW_RE.captures(line.trim())?;
            Some(NodeStatusRow {
                state: caps[1].to_string(),
                address: caps[2].to_string(),
            })
        })
        .collect()
}

/// Extract `(address, token)` pairs from a ring listing.
///
/// A row qualifies when it has at least [`MIN_RING_COLUMNS`] columns and its
/// last column parses as an integer token.
pub fn parse_ring(output: &str) -> Vec<RingEntry> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < MIN_RING_COLUMNS {
                return None;
            }
            let token = parts[parts.len() - 1].parse::<Token>().ok()?;
            Some(RingEntry {
                address: parts[0].to_string(),
                token,
            })
        })
        .collect()
}

/// Pick the local node's address from the status rows.
///
/// Only nodes that are up are candidates; the admin tool cannot answer for a
/// node that is down. A single candidate is taken as is. Among several, the
/// one listed in `host_addresses` (addresses this host is known to hold)
/// wins. Without exactly one such match the local node cannot be told apart
/// from its peers and the caller must supply the address explicitly.
pub fn select_local_address(
    rows: &[NodeStatusRow],
    host_addresses: &[String],
) -> Result<String, RepairError> {
    let up: Vec<&NodeStatusRow> = rows.iter().filter(|r| r.is_up()).collect();
    match up.as_slice() {
        [] if rows.is_empty() => Err(RepairError::TopologyUnavailable(
            "status listing contains no node rows".to_string(),
        )),
        [] => Err(RepairError::TopologyUnavailable(
            "status listing contains no up nodes".to_string(),
        )),
        [only] => Ok(only.address.clone()),
        many => {
            let own: Vec<&str> = many
                .iter()
                .map(|r| r.address.as_str())
                .filter(|a| host_addresses.iter().any(|h| h == a))
                .collect();
            if let [address] = own.as_slice() {
                return Ok(address.to_string());
            }
            let candidates: Vec<&str> = many.iter().map(|r| r.address.as_str()).collect();
            Err(RepairError::TopologyUnavailable(format!(
                "local address is ambiguous among {} up nodes ({}); set it explicitly",
                candidates.len(),
                candidates.join(", ")
            )))
        }
    }
}

/// Split ring entries into the full token set and the tokens owned by
/// `address`.
///
/// Fails when the ring yielded no tokens at all or none for `address`.
pub fn split_ring(entries: &[RingEntry], address: &str) -> Result<RingTokens, RepairError> {
    if entries.is_empty() {
        return Err(RepairError::TopologyUnavailable(
            "ring listing contains no tokens".to_string(),
        ));
    }

    let all: Vec<Token> = entries.iter().map(|e| e.token).collect();
    let local: Vec<Token> = entries
        .iter()
        .filter(|e| e.address == address)
        .map(|e| e.token)
        .collect();

    if local.is_empty() {
        return Err(RepairError::TopologyUnavailable(format!(
            "no tokens listed for {address} in ring output"
        )));
    }

    Ok(RingTokens { all, local })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
