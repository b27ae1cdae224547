// Raw counter readers: one-shot OS queries returning absolute or cumulative values.
// Readers hold no delta state; monitors own that.

mod linux;

use std::path::PathBuf;
use std::sync::Mutex;

use sysinfo::Networks;

use crate::error::ReadError;
use crate::monitors::lock_or_recover;

pub use linux::{
    parse_diskstats, parse_meminfo, parse_proc_stat, read_drm_devices, read_power_supplies,
    summarize_power_supplies,
};

/// A single raw counter query.
pub trait CounterSource: Send + Sync {
    type Output;

    fn read(&self) -> Result<Self::Output, ReadError>;
}

/// Cumulative scheduler ticks for one CPU (or the aggregate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuTickSample {
    pub total: CpuTicks,
    pub cores: Vec<CpuTicks>,
}

/// Point-in-time memory partition, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCounters {
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub wired: u64,
    pub compressed: u64,
    pub total_physical: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskCounters {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkCounters {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawGpuDevice {
    pub name: String,
    pub utilization: f64,
    pub vram_used: Option<u64>,
    pub vram_total: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Ac,
    Battery,
    Ups,
    Unknown,
}

/// Power-source descriptor as reported by the OS.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPowerSource {
    pub level: f64,
    pub is_charging: bool,
    pub state: PowerState,
    pub has_battery: bool,
    pub cycle_count: Option<u32>,
    pub health: Option<f64>,
    pub time_remaining_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PowerReading {
    /// `None` when the machine exposes no power-source descriptor.
    pub source: Option<RawPowerSource>,
    pub hottest_zone_celsius: Option<f64>,
}

/// Aggregate and per-core ticks from `/proc/stat`.
pub struct ProcStatCpu {
    path: PathBuf,
}

impl Default for ProcStatCpu {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/stat"),
        }
    }
}

impl CounterSource for ProcStatCpu {
    type Output = CpuTickSample;

    fn read(&self) -> Result<CpuTickSample, ReadError> {
        if !cfg!(target_os = "linux") {
            return Err(ReadError::Unsupported("cpu tick counters"));
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ReadError::io(&self.path, e))?;
        parse_proc_stat(&content)
    }
}

/// Memory partition from `/proc/meminfo`.
pub struct ProcMeminfo {
    path: PathBuf,
}

impl Default for ProcMeminfo {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
        }
    }
}

impl CounterSource for ProcMeminfo {
    type Output = MemoryCounters;

    fn read(&self) -> Result<MemoryCounters, ReadError> {
        if !cfg!(target_os = "linux") {
            return Err(ReadError::Unsupported("memory statistics"));
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ReadError::io(&self.path, e))?;
        parse_meminfo(&content)
    }
}

/// Cumulative block-device I/O from `/proc/diskstats`.
pub struct ProcDiskstats {
    path: PathBuf,
}

impl Default for ProcDiskstats {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/diskstats"),
        }
    }
}

impl CounterSource for ProcDiskstats {
    type Output = DiskCounters;

    fn read(&self) -> Result<DiskCounters, ReadError> {
        if !cfg!(target_os = "linux") {
            return Err(ReadError::Unsupported("block-storage counters"));
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ReadError::io(&self.path, e))?;
        Ok(parse_diskstats(&content, linux::is_whole_block_device))
    }
}

/// Cumulative interface byte counters via sysinfo.
pub struct SysinfoNetworks {
    networks: Mutex<Networks>,
}

impl Default for SysinfoNetworks {
    fn default() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl CounterSource for SysinfoNetworks {
    type Output = NetworkCounters;

    fn read(&self) -> Result<NetworkCounters, ReadError> {
        let mut networks = lock_or_recover(&self.networks);
        networks.refresh(true);
        let counters = networks
            .iter()
            .filter(|(name, _)| !is_loopback(name))
            .fold(NetworkCounters::default(), |acc, (_, data)| NetworkCounters {
                bytes_in: acc.bytes_in.saturating_add(data.total_received()),
                bytes_out: acc.bytes_out.saturating_add(data.total_transmitted()),
            });
        Ok(counters)
    }
}

fn is_loopback(name: &str) -> bool {
    name == "lo" || name.starts_with("lo0")
}

/// GPU accelerators from the DRM sysfs tree.
pub struct DrmGpus {
    root: PathBuf,
}

impl Default for DrmGpus {
    fn default() -> Self {
        Self::with_root("/sys/class/drm")
    }
}

impl DrmGpus {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CounterSource for DrmGpus {
    type Output = Vec<RawGpuDevice>;

    fn read(&self) -> Result<Vec<RawGpuDevice>, ReadError> {
        read_drm_devices(&self.root)
    }
}

/// Battery / mains descriptors from `/sys/class/power_supply` plus thermal zones.
pub struct SysfsPowerSupply {
    supply_root: PathBuf,
    thermal_root: PathBuf,
}

impl Default for SysfsPowerSupply {
    fn default() -> Self {
        Self::with_roots("/sys/class/power_supply", "/sys/class/thermal")
    }
}

impl SysfsPowerSupply {
    pub fn with_roots(supply_root: impl Into<PathBuf>, thermal_root: impl Into<PathBuf>) -> Self {
        Self {
            supply_root: supply_root.into(),
            thermal_root: thermal_root.into(),
        }
    }
}

impl CounterSource for SysfsPowerSupply {
    type Output = PowerReading;

    fn read(&self) -> Result<PowerReading, ReadError> {
        let supplies = read_power_supplies(&self.supply_root)?;
        Ok(PowerReading {
            source: summarize_power_supplies(&supplies),
            hottest_zone_celsius: linux::hottest_thermal_zone(&self.thermal_root),
        })
    }
}
