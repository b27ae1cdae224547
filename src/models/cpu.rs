// CPU usage snapshot

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreUsage {
    /// Core index as reported by the kernel; stable while the core count is unchanged.
    pub id: usize,
    pub usage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    /// `user_usage + system_usage`.
    pub total_usage: f64,
    /// User time including niced processes.
    pub user_usage: f64,
    pub system_usage: f64,
    pub idle_usage: f64,
    pub core_usages: Vec<CoreUsage>,
    pub timestamp: u64,
}

impl CpuUsage {
    /// Neutral reading used before a delta is available: nothing busy, fully idle.
    pub fn idle(core_count: usize, timestamp: u64) -> Self {
        Self {
            total_usage: 0.0,
            user_usage: 0.0,
            system_usage: 0.0,
            idle_usage: 100.0,
            core_usages: (0..core_count)
                .map(|id| CoreUsage { id, usage: 0.0 })
                .collect(),
            timestamp,
        }
    }

    pub fn zero() -> Self {
        Self {
            total_usage: 0.0,
            user_usage: 0.0,
            system_usage: 0.0,
            idle_usage: 0.0,
            core_usages: vec![],
            timestamp: 0,
        }
    }
}
