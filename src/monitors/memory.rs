// Memory partition (point-in-time, no delta state)

use tracing::instrument;

use super::Monitor;
use crate::counters::{CounterSource, MemoryCounters, ProcMeminfo};
use crate::models::{MemoryUsage, now_millis};

pub struct MemoryMonitor {
    source: Box<dyn CounterSource<Output = MemoryCounters>>,
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new(ProcMeminfo::default())
    }
}

impl MemoryMonitor {
    pub fn new(source: impl CounterSource<Output = MemoryCounters> + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    #[instrument(level = "debug", skip(self), fields(monitor = "memory", operation = "snapshot"))]
    pub fn snapshot(&self) -> MemoryUsage {
        let timestamp = now_millis();
        match self.source.read() {
            Ok(c) => MemoryUsage {
                free: c.free,
                active: c.active,
                inactive: c.inactive,
                wired: c.wired,
                compressed: c.compressed,
                total_physical: c.total_physical,
                timestamp,
            },
            Err(e) => {
                tracing::debug!(error = %e, operation = "read_memory", "memory counters unavailable");
                MemoryUsage {
                    timestamp,
                    ..MemoryUsage::zero()
                }
            }
        }
    }
}

impl Monitor for MemoryMonitor {
    type Snapshot = MemoryUsage;

    fn snapshot(&self) -> MemoryUsage {
        MemoryMonitor::snapshot(self)
    }
}
