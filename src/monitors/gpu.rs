// GPU utilization; overall figure is the busiest device

use tracing::instrument;

use super::{Monitor, clamp_percent};
use crate::counters::{CounterSource, DrmGpus, RawGpuDevice};
use crate::models::{GpuDeviceUsage, GpuUsage, now_millis};

pub struct GpuMonitor {
    source: Box<dyn CounterSource<Output = Vec<RawGpuDevice>>>,
}

impl Default for GpuMonitor {
    fn default() -> Self {
        Self::new(DrmGpus::default())
    }
}

impl GpuMonitor {
    pub fn new(source: impl CounterSource<Output = Vec<RawGpuDevice>> + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    #[instrument(level = "debug", skip(self), fields(monitor = "gpu", operation = "snapshot"))]
    pub fn snapshot(&self) -> GpuUsage {
        let timestamp = now_millis();
        let raw = self.source.read().unwrap_or_else(|e| {
            tracing::debug!(error = %e, operation = "read_gpu", "GPU statistics unavailable");
            vec![]
        });

        let devices: Vec<GpuDeviceUsage> = raw
            .into_iter()
            .enumerate()
            .map(|(id, d)| GpuDeviceUsage {
                id,
                name: d.name,
                utilization: clamp_percent(d.utilization),
                vram_used: d.vram_used,
                vram_total: d.vram_total,
            })
            .collect();
        let utilization = devices
            .iter()
            .map(|d| d.utilization)
            .fold(0.0, f64::max);

        GpuUsage {
            utilization,
            devices,
            timestamp,
        }
    }
}

impl Monitor for GpuMonitor {
    type Snapshot = GpuUsage;

    fn snapshot(&self) -> GpuUsage {
        GpuMonitor::snapshot(self)
    }
}
