// Composite snapshot: every domain for one tick

use serde::{Deserialize, Serialize};

use super::{BatteryUsage, CpuUsage, DiskUsage, GpuUsage, MemoryUsage, NetworkUsage, ThermalUsage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub gpu: GpuUsage,
    pub network: NetworkUsage,
    pub disk: DiskUsage,
    pub battery: BatteryUsage,
    pub thermal: ThermalUsage,
    pub timestamp: u64,
}

impl SystemStats {
    /// All-zero snapshot exposed before the first tick completes.
    pub fn zero() -> Self {
        Self {
            cpu: CpuUsage::zero(),
            memory: MemoryUsage::zero(),
            gpu: GpuUsage::zero(),
            network: NetworkUsage::zero(),
            disk: DiskUsage::zero(),
            battery: BatteryUsage::zero(),
            thermal: ThermalUsage::zero(),
            timestamp: 0,
        }
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::zero()
    }
}
