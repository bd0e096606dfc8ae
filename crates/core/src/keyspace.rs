//! Keyspace selection: which logical containers a run repairs.

use crate::error::RepairError;

/// Internal keyspaces that are never repaired by default.
pub const SYSTEM_KEYSPACES: &[&str] = &[
    "system",
    "system_auth",
    "system_distributed",
    "system_schema",
    "system_traces",
    "system_views",
    "system_virtual_schema",
    "dse_system",
    "dse_perf",
    "dse_security",
    "solr_admin",
];

/// Case-sensitive exact match against [`SYSTEM_KEYSPACES`].
pub fn is_system_keyspace(name: &str) -> bool {
    SYSTEM_KEYSPACES.contains(&name)
}

/// Split a keyspace listing into names.
///
/// Accepts one name per line as well as space-separated names on a line.
pub fn parse_keyspace_listing(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Drop system keyspaces and duplicates, keeping first-seen order.
///
/// Fails with [`RepairError::NoKeyspaces`] when nothing remains.
pub fn select_user_keyspaces<S: AsRef<str>>(listed: &[S]) -> Result<Vec<String>, RepairError> {
    let mut selected: Vec<String> = Vec::new();
    for name in listed.iter().map(AsRef::as_ref) {
        if is_system_keyspace(name) || selected.iter().any(|s| s == name) {
            continue;
        }
        selected.push(name.to_string());
    }

    if selected.is_empty() {
        return Err(RepairError::NoKeyspaces);
    }
    Ok(selected)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
