// Domain models: immutable per-tick snapshots for every metric domain

mod battery;
mod cpu;
mod gpu;
mod io;
mod memory;
mod process;
mod system;
mod thermal;

pub use battery::{BatteryUsage, PowerSourceKind, ThermalPressure};
pub use cpu::{CoreUsage, CpuUsage};
pub use gpu::{GpuDeviceUsage, GpuUsage};
pub use io::{DiskUsage, NetworkUsage};
pub use memory::MemoryUsage;
pub use process::{ProcessEntry, ProcessMetricSample};
pub use system::SystemStats;
pub use thermal::{FanMode, FanStatus, TemperatureReading, ThermalUsage};

/// Milliseconds since the UNIX epoch; 0 if the system clock is before the epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
