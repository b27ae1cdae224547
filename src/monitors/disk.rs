// Block-device throughput from cumulative byte counters

use std::time::Instant;

use tracing::instrument;

use super::{Monitor, RateTracker};
use crate::counters::{CounterSource, DiskCounters, ProcDiskstats};
use crate::models::{DiskUsage, now_millis};

pub struct DiskMonitor {
    source: Box<dyn CounterSource<Output = DiskCounters>>,
    rates: RateTracker,
}

impl Default for DiskMonitor {
    fn default() -> Self {
        Self::new(ProcDiskstats::default())
    }
}

impl DiskMonitor {
    pub fn new(source: impl CounterSource<Output = DiskCounters> + 'static) -> Self {
        Self {
            source: Box::new(source),
            rates: RateTracker::default(),
        }
    }

    pub fn snapshot(&self) -> DiskUsage {
        self.snapshot_at(Instant::now())
    }

    /// Snapshot with an explicit monotonic clock reading for the rate divisor.
    #[instrument(level = "debug", skip(self, now), fields(monitor = "disk", operation = "snapshot"))]
    pub fn snapshot_at(&self, now: Instant) -> DiskUsage {
        let timestamp = now_millis();
        let counters = match self.source.read() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, operation = "read_disk", "disk counters unavailable");
                return DiskUsage {
                    timestamp,
                    ..DiskUsage::zero()
                };
            }
        };
        let (read_per_second, write_per_second) =
            self.rates
                .update(counters.bytes_read, counters.bytes_written, now);
        DiskUsage {
            bytes_read: counters.bytes_read,
            bytes_written: counters.bytes_written,
            read_per_second,
            write_per_second,
            timestamp,
        }
    }
}

impl Monitor for DiskMonitor {
    type Snapshot = DiskUsage;

    fn snapshot(&self) -> DiskUsage {
        DiskMonitor::snapshot(self)
    }
}
