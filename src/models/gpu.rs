// GPU utilization snapshot

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuDeviceUsage {
    pub id: usize,
    pub name: String,
    pub utilization: f64,
    pub vram_used: Option<u64>,
    pub vram_total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuUsage {
    /// Highest utilization across devices.
    pub utilization: f64,
    pub devices: Vec<GpuDeviceUsage>,
    pub timestamp: u64,
}

impl GpuUsage {
    pub fn zero() -> Self {
        Self {
            utilization: 0.0,
            devices: vec![],
            timestamp: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.devices.is_empty()
    }
}
