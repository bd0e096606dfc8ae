//! Topology discovery: who this node is and which tokens it owns.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use ringrepair_core::error::RepairError;
use ringrepair_core::topology::{select_local_address, split_ring, NodeStatusRow, RingTokens};
use tokio::net::UdpSocket;

use crate::admin::AdminTool;

/// Queries the administrative tool for node identity and ring layout.
///
/// Failures are reported as [`RepairError::TopologyUnavailable`] and never
/// retried here.
pub struct TopologyClient<'a, T> {
    tool: &'a T,
}

impl<'a, T: AdminTool> TopologyClient<'a, T> {
    pub fn new(tool: &'a T) -> Self {
        Self { tool }
    }

    /// The local node's address, taken from `explicit` when given,
    /// otherwise from the status listing.
    pub async fn discover_local_address(
        &self,
        explicit: Option<&str>,
    ) -> Result<String, RepairError> {
        if let Some(address) = explicit {
            tracing::info!(address, "Using configured local address");
            return Ok(address.to_string());
        }

        let rows = self
            .tool
            .query_status()
            .await
            .map_err(|e| RepairError::TopologyUnavailable(format!("status query failed: {e}")))?;

        let host_addresses = host_addresses(&rows).await;
        let address = select_local_address(&rows, &host_addresses)?;
        tracing::info!(address = %address, "Detected local address from status listing");
        Ok(address)
    }

    /// All ring tokens and the subset owned by `address`.
    pub async fn discover_ring_tokens(&self, address: &str) -> Result<RingTokens, RepairError> {
        let entries = self
            .tool
            .query_ring()
            .await
            .map_err(|e| RepairError::TopologyUnavailable(format!("ring query failed: {e}")))?;

        let ring = split_ring(&entries, address)?;
        tracing::info!(
            address,
            ring_tokens = ring.all.len(),
            local_tokens = ring.local.len(),
            "Fetched ring layout",
        );
        Ok(ring)
    }
}

/// Port used only to pick a route; nothing is ever sent.
const ROUTE_LOOKUP_PORT: u16 = 7000;

/// Addresses this host would use to reach the cluster, looked up only when
/// several nodes are up.
///
/// Connecting a UDP socket sends no packets but makes the kernel choose a
/// source address, which is the address peers know this node by on a
/// single-homed host.
async fn host_addresses(rows: &[NodeStatusRow]) -> Vec<String> {
    let up: Vec<&NodeStatusRow> = rows.iter().filter(|r| r.is_up()).collect();
    if up.len() < 2 {
        return Vec::new();
    }
    let Some(peer) = up
        .iter()
        .find_map(|r| r.address.parse::<IpAddr>().ok())
    else {
        return Vec::new();
    };

    match route_source_address(peer).await {
        Some(source) => {
            tracing::debug!(peer = %peer, source = %source, "Resolved host address");
            vec![source.to_string()]
        }
        None => Vec::new(),
    }
}

async fn route_source_address(target: IpAddr) -> Option<IpAddr> {
    let bind: SocketAddr = match target {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind).await.ok()?;
    socket.connect((target, ROUTE_LOOKUP_PORT)).await.ok()?;
    let source = socket.local_addr().ok()?.ip();
    (!source.is_unspecified()).then_some(source)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
