//! Keyspace resolution for a run.

use ringrepair_core::error::RepairError;
use ringrepair_core::keyspace::select_user_keyspaces;

use crate::admin::AdminTool;

/// Decides which keyspaces a run repairs.
pub struct KeyspaceResolver<'a, T> {
    tool: &'a T,
}

impl<'a, T: AdminTool> KeyspaceResolver<'a, T> {
    pub fn new(tool: &'a T) -> Self {
        Self { tool }
    }

    /// Return `explicit` alone when given (the tool validates it at repair
    /// time), otherwise every non-system keyspace the tool lists.
    pub async fn resolve(&self, explicit: Option<&str>) -> Result<Vec<String>, RepairError> {
        if let Some(keyspace) = explicit {
            tracing::info!(keyspace, "Repairing the requested keyspace only");
            return Ok(vec![keyspace.to_string()]);
        }

        tracing::info!("No keyspace specified, resolving all non-system keyspaces");
        let listed = self.tool.query_keyspaces().await.map_err(|e| {
            RepairError::TopologyUnavailable(format!("keyspace query failed: {e}"))
        })?;

        let keyspaces = select_user_keyspaces(&listed)?;
        tracing::info!(keyspaces = ?keyspaces, "Found keyspaces to repair");
        Ok(keyspaces)
    }
}
