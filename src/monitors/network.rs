// Interface throughput from cumulative byte counters

use std::time::Instant;

use tracing::instrument;

use super::{Monitor, RateTracker};
use crate::counters::{CounterSource, NetworkCounters, SysinfoNetworks};
use crate::models::{NetworkUsage, now_millis};

pub struct NetworkMonitor {
    source: Box<dyn CounterSource<Output = NetworkCounters>>,
    rates: RateTracker,
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(SysinfoNetworks::default())
    }
}

impl NetworkMonitor {
    pub fn new(source: impl CounterSource<Output = NetworkCounters> + 'static) -> Self {
        Self {
            source: Box::new(source),
            rates: RateTracker::default(),
        }
    }

    pub fn snapshot(&self) -> NetworkUsage {
        self.snapshot_at(Instant::now())
    }

    #[instrument(level = "debug", skip(self, now), fields(monitor = "network", operation = "snapshot"))]
    pub fn snapshot_at(&self, now: Instant) -> NetworkUsage {
        let timestamp = now_millis();
        let counters = match self.source.read() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, operation = "read_network", "network counters unavailable");
                return NetworkUsage {
                    timestamp,
                    ..NetworkUsage::zero()
                };
            }
        };
        let (bytes_in_per_second, bytes_out_per_second) =
            self.rates.update(counters.bytes_in, counters.bytes_out, now);
        NetworkUsage {
            bytes_in: counters.bytes_in,
            bytes_out: counters.bytes_out,
            bytes_in_per_second,
            bytes_out_per_second,
            timestamp,
        }
    }
}

impl Monitor for NetworkMonitor {
    type Snapshot = NetworkUsage;

    fn snapshot(&self) -> NetworkUsage {
        NetworkMonitor::snapshot(self)
    }
}
