// Memory usage snapshot

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub wired: u64,
    pub compressed: u64,
    pub total_physical: u64,
    pub timestamp: u64,
}

impl MemoryUsage {
    pub fn zero() -> Self {
        Self {
            free: 0,
            active: 0,
            inactive: 0,
            wired: 0,
            compressed: 0,
            total_physical: 0,
            timestamp: 0,
        }
    }

    /// Bytes held by the system: active + wired + compressed.
    pub fn used(&self) -> u64 {
        self.active
            .saturating_add(self.wired)
            .saturating_add(self.compressed)
    }

    /// `used / total * 100`, clamped to [0, 100]; 0 when the total is unknown.
    pub fn usage_percentage(&self) -> f64 {
        if self.total_physical == 0 {
            return 0.0;
        }
        (self.used() as f64 / self.total_physical as f64 * 100.0).clamp(0.0, 100.0)
    }
}
