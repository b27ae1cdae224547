// CPU usage from scheduler tick deltas

use std::sync::Mutex;

use tracing::instrument;

use super::{Monitor, clamp_percent, counter_delta, lock_or_recover};
use crate::counters::{CounterSource, CpuTickSample, CpuTicks, ProcStatCpu};
use crate::models::{CoreUsage, CpuUsage, now_millis};

pub struct CpuMonitor {
    source: Box<dyn CounterSource<Output = CpuTickSample>>,
    previous: Mutex<Option<CpuTickSample>>,
}

impl Default for CpuMonitor {
    fn default() -> Self {
        Self::new(ProcStatCpu::default())
    }
}

struct TickDeltas {
    user: f64,
    system: f64,
    idle: f64,
    nice: f64,
}

impl TickDeltas {
    fn between(current: &CpuTicks, previous: &CpuTicks) -> Self {
        Self {
            user: counter_delta(current.user, previous.user) as f64,
            system: counter_delta(current.system, previous.system) as f64,
            idle: counter_delta(current.idle, previous.idle) as f64,
            nice: counter_delta(current.nice, previous.nice) as f64,
        }
    }

    fn total(&self) -> f64 {
        self.user + self.system + self.idle + self.nice
    }
}

impl CpuMonitor {
    pub fn new(source: impl CounterSource<Output = CpuTickSample> + 'static) -> Self {
        Self {
            source: Box::new(source),
            previous: Mutex::new(None),
        }
    }

    #[instrument(level = "debug", skip(self), fields(monitor = "cpu", operation = "snapshot"))]
    pub fn snapshot(&self) -> CpuUsage {
        let timestamp = now_millis();
        let current = match self.source.read() {
            Ok(sample) => sample,
            Err(e) => {
                tracing::debug!(error = %e, operation = "read_cpu_ticks", "CPU ticks unavailable");
                return CpuUsage::idle(0, timestamp);
            }
        };

        let previous = lock_or_recover(&self.previous).replace(current.clone());
        let Some(previous) = previous else {
            return CpuUsage::idle(current.cores.len(), timestamp);
        };

        let core_usages = per_core_usage(&current.cores, &previous.cores);
        let deltas = TickDeltas::between(&current.total, &previous.total);
        let total = deltas.total();
        if total <= 0.0 {
            return CpuUsage {
                core_usages,
                ..CpuUsage::idle(0, timestamp)
            };
        }

        let user = clamp_percent((deltas.user + deltas.nice) / total * 100.0);
        let system = clamp_percent(deltas.system / total * 100.0);
        let idle = clamp_percent(deltas.idle / total * 100.0);
        CpuUsage {
            total_usage: clamp_percent(user + system),
            user_usage: user,
            system_usage: system,
            idle_usage: idle,
            core_usages,
            timestamp,
        }
    }
}

/// Busy share per core. A changed core count zeroes every core for this tick.
fn per_core_usage(current: &[CpuTicks], previous: &[CpuTicks]) -> Vec<CoreUsage> {
    if current.len() != previous.len() {
        return (0..current.len())
            .map(|id| CoreUsage { id, usage: 0.0 })
            .collect();
    }
    current
        .iter()
        .zip(previous)
        .enumerate()
        .map(|(id, (cur, prev))| {
            let d = TickDeltas::between(cur, prev);
            let total = d.total();
            let usage = if total > 0.0 {
                clamp_percent((d.user + d.system + d.nice) / total * 100.0)
            } else {
                0.0
            };
            CoreUsage { id, usage }
        })
        .collect()
}

impl Monitor for CpuMonitor {
    type Snapshot = CpuUsage;

    fn snapshot(&self) -> CpuUsage {
        CpuMonitor::snapshot(self)
    }
}
