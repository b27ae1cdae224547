// Disk and network throughput snapshots

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    /// Cumulative bytes read across all block devices.
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub read_per_second: f64,
    pub write_per_second: f64,
    pub timestamp: u64,
}

impl DiskUsage {
    pub fn zero() -> Self {
        Self {
            bytes_read: 0,
            bytes_written: 0,
            read_per_second: 0.0,
            write_per_second: 0.0,
            timestamp: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkUsage {
    /// Cumulative bytes received across non-loopback interfaces.
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub bytes_in_per_second: f64,
    pub bytes_out_per_second: f64,
    pub timestamp: u64,
}

impl NetworkUsage {
    pub fn zero() -> Self {
        Self {
            bytes_in: 0,
            bytes_out: 0,
            bytes_in_per_second: 0.0,
            bytes_out_per_second: 0.0,
            timestamp: 0,
        }
    }
}
