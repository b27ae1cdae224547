// Per-process snapshot (recreated every poll)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    /// Application identifier (desktop app id on Linux), when the process belongs to one.
    pub bundle_identifier: Option<String>,
    /// CPU time over wall time since the previous poll, in percent of one core.
    pub cpu_usage: f64,
    pub memory_bytes: u64,
    pub user: String,
    pub is_active: bool,
    /// Icon name resolvable by the presentation layer.
    pub icon: Option<String>,
}

/// One point of the selected process's CPU/memory history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetricSample {
    pub timestamp: u64,
    pub cpu_usage: f64,
    pub memory_bytes: u64,
}
