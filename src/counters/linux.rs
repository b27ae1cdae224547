// Linux-specific readers: /proc text tables and /sys attribute trees.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{
    CpuTickSample, CpuTicks, DiskCounters, MemoryCounters, PowerState, RawGpuDevice,
    RawPowerSource,
};
use crate::error::ReadError;

const SECTOR_BYTES: u64 = 512;

/// Parse the aggregate `cpu` line and every `cpuN` line of `/proc/stat`.
/// irq/softirq/steal count as system time, iowait as idle.
pub fn parse_proc_stat(content: &str) -> Result<CpuTickSample, ReadError> {
    let mut total = None;
    let mut cores = Vec::new();
    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else {
            continue;
        };
        if !label.starts_with("cpu") {
            continue;
        }
        let values: Vec<u64> = fields.map_while(|f| f.parse().ok()).collect();
        if values.len() < 4 {
            return Err(ReadError::parse("/proc/stat", format!("short line: {line}")));
        }
        let field = |i: usize| values.get(i).copied().unwrap_or(0);
        let ticks = CpuTicks {
            user: field(0),
            nice: field(1),
            system: field(2)
                .saturating_add(field(5))
                .saturating_add(field(6))
                .saturating_add(field(7)),
            idle: field(3).saturating_add(field(4)),
        };
        if label == "cpu" {
            total = Some(ticks);
        } else {
            cores.push(ticks);
        }
    }
    let total = total.ok_or_else(|| ReadError::parse("/proc/stat", "missing aggregate cpu line"))?;
    Ok(CpuTickSample { total, cores })
}

/// Parse `/proc/meminfo` (kB values) into byte counts.
/// Unevictable pages stand in for wired memory, zswap for compressed.
pub fn parse_meminfo(content: &str) -> Result<MemoryCounters, ReadError> {
    let mut fields: HashMap<&str, u64> = HashMap::new();
    for line in content.lines() {
        if let Some((key, rest)) = line.split_once(':')
            && let Some(value) = rest.split_whitespace().next()
            && let Ok(kb) = value.parse::<u64>()
        {
            fields.insert(key.trim(), kb.saturating_mul(1024));
        }
    }
    let total_physical = *fields
        .get("MemTotal")
        .ok_or_else(|| ReadError::parse("/proc/meminfo", "missing MemTotal"))?;
    let get = |key: &str| fields.get(key).copied().unwrap_or(0);
    Ok(MemoryCounters {
        free: get("MemFree"),
        active: get("Active"),
        inactive: get("Inactive"),
        wired: get("Unevictable"),
        compressed: get("Zswap"),
        total_physical,
    })
}

/// Sum sectors read/written over the devices accepted by `include`.
/// Fields: 2 = name, 5 = sectors read, 9 = sectors written.
pub fn parse_diskstats(content: &str, include: impl Fn(&str) -> bool) -> DiskCounters {
    let mut counters = DiskCounters::default();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 || !include(parts[2]) {
            continue;
        }
        let sectors_read = parts[5].parse::<u64>().unwrap_or(0);
        let sectors_written = parts[9].parse::<u64>().unwrap_or(0);
        counters.bytes_read = counters
            .bytes_read
            .saturating_add(sectors_read.saturating_mul(SECTOR_BYTES));
        counters.bytes_written = counters
            .bytes_written
            .saturating_add(sectors_written.saturating_mul(SECTOR_BYTES));
    }
    counters
}

/// `true` for physical whole disks; partitions and virtual devices
/// (loop, ram, zram, device-mapper) would double count.
pub(super) fn is_whole_block_device(name: &str) -> bool {
    if ["loop", "ram", "zram", "dm-", "md", "sr"]
        .iter()
        .any(|p| name.starts_with(p))
    {
        return false;
    }
    let sys_block = Path::new("/sys/block");
    if sys_block.is_dir() {
        return sys_block.join(name).join("device").exists();
    }
    is_whole_device_name(name)
}

/// Name heuristics for when /sys is unavailable (some containers).
fn is_whole_device_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if (name.starts_with("sd") || name.starts_with("vd") || name.starts_with("hd"))
        && name.len() == 3
        && bytes[2].is_ascii_alphabetic()
    {
        return true;
    }
    if name.starts_with("xvd") && name.len() == 4 && bytes[3].is_ascii_alphabetic() {
        return true;
    }
    if name.starts_with("nvme") {
        return name.contains('n') && !name.contains('p');
    }
    if name.starts_with("mmcblk") {
        return !name.contains('p');
    }
    false
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_u64(path: &Path) -> Option<u64> {
    read_trimmed(path)?.parse().ok()
}

/// Enumerate `cardN` entries (connectors like `card0-HDMI-A-1` are skipped),
/// ordered by card number. A missing tree means no accelerator.
pub fn read_drm_devices(root: &Path) -> Result<Vec<RawGpuDevice>, ReadError> {
    let entries = match fs::read_dir(root) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(ReadError::io(root, e)),
    };
    let mut cards: Vec<(u32, std::path::PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = name.strip_prefix("card")?.parse::<u32>().ok()?;
            let device = entry.path().join("device");
            device.is_dir().then_some((index, device))
        })
        .collect();
    cards.sort_by_key(|(index, _)| *index);

    Ok(cards
        .into_iter()
        .map(|(index, device)| {
            let uevent = fs::read_to_string(device.join("uevent")).unwrap_or_default();
            let uevent_field = |key: &str| {
                uevent
                    .lines()
                    .find_map(|l| l.strip_prefix(key))
                    .map(str::to_string)
            };
            let name = match (uevent_field("DRIVER="), uevent_field("PCI_SLOT_NAME=")) {
                (Some(driver), Some(slot)) => format!("{driver} ({slot})"),
                (Some(driver), None) => driver,
                _ => format!("card{index}"),
            };
            let utilization = read_u64(&device.join("gpu_busy_percent"))
                .map(|v| (v as f64).clamp(0.0, 100.0))
                .unwrap_or(0.0);
            RawGpuDevice {
                name,
                utilization,
                vram_used: read_u64(&device.join("mem_info_vram_used")),
                vram_total: read_u64(&device.join("mem_info_vram_total")),
            }
        })
        .collect())
}

const SUPPLY_ATTRIBUTES: &[&str] = &[
    "type",
    "scope",
    "status",
    "online",
    "capacity",
    "cycle_count",
    "energy_now",
    "energy_full",
    "energy_full_design",
    "power_now",
    "charge_now",
    "charge_full",
    "charge_full_design",
    "current_now",
];

/// Attribute maps for every entry under `/sys/class/power_supply`, sorted by name.
pub fn read_power_supplies(root: &Path) -> Result<Vec<HashMap<String, String>>, ReadError> {
    let entries = match fs::read_dir(root) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(ReadError::io(root, e)),
    };
    let mut dirs: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    dirs.sort();
    Ok(dirs
        .iter()
        .map(|dir| {
            SUPPLY_ATTRIBUTES
                .iter()
                .filter_map(|attr| read_trimmed(&dir.join(attr)).map(|v| (attr.to_string(), v)))
                .collect()
        })
        .collect())
}

/// Collapse supply descriptors into one power-source reading. The first
/// system battery (peripheral batteries have scope=Device) supplies the level.
pub fn summarize_power_supplies(supplies: &[HashMap<String, String>]) -> Option<RawPowerSource> {
    fn kind(s: &HashMap<String, String>) -> &str {
        s.get("type").map(String::as_str).unwrap_or("")
    }
    let num = |s: &HashMap<String, String>, key: &str| -> Option<f64> {
        s.get(key).and_then(|v| v.parse::<f64>().ok())
    };

    let battery = supplies
        .iter()
        .find(|s| kind(s) == "Battery" && s.get("scope").map(String::as_str) != Some("Device"));
    let mains_online = supplies.iter().any(|s| {
        matches!(kind(s), "Mains" | "USB" | "USB_C" | "USB_PD")
            && s.get("online").map(String::as_str) == Some("1")
    });
    let has_mains = supplies
        .iter()
        .any(|s| matches!(kind(s), "Mains" | "USB" | "USB_C" | "USB_PD"));
    let ups = supplies.iter().find(|s| kind(s) == "UPS");

    if battery.is_none() && !has_mains && ups.is_none() {
        return None;
    }

    let status = battery
        .and_then(|b| b.get("status"))
        .map(String::as_str)
        .unwrap_or("");
    let is_charging = status == "Charging";
    let is_plugged_in = mains_online || matches!(status, "Charging" | "Full" | "Not charging");

    let state = if is_plugged_in {
        PowerState::Ac
    } else if battery.is_some() {
        PowerState::Battery
    } else if ups.is_some() {
        PowerState::Ups
    } else {
        PowerState::Unknown
    };

    let Some(battery) = battery else {
        return Some(RawPowerSource {
            level: ups.and_then(|u| num(u, "capacity")).unwrap_or(0.0),
            is_charging: false,
            state,
            has_battery: false,
            cycle_count: None,
            health: None,
            time_remaining_secs: None,
        });
    };

    let level = num(battery, "capacity").unwrap_or(0.0).clamp(0.0, 100.0);
    let cycle_count = battery
        .get("cycle_count")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|c| *c > 0);
    let ratio = |now: &str, full: &str| -> Option<f64> {
        let (n, f) = (num(battery, now)?, num(battery, full)?);
        (f > 0.0).then(|| n / f)
    };
    let health = ratio("energy_full", "energy_full_design")
        .or_else(|| ratio("charge_full", "charge_full_design"))
        .map(|r| (r * 100.0).clamp(0.0, 100.0));
    let time_remaining_secs = if status == "Discharging" {
        ratio("energy_now", "power_now")
            .or_else(|| ratio("charge_now", "current_now"))
            .filter(|hours| hours.is_finite() && *hours > 0.0)
            .map(|hours| (hours * 3600.0) as u64)
    } else {
        None
    };

    Some(RawPowerSource {
        level,
        is_charging,
        state,
        has_battery: true,
        cycle_count,
        health,
        time_remaining_secs,
    })
}

/// Hottest `thermal_zone*/temp` in °C (sysfs reports millidegrees).
pub(super) fn hottest_thermal_zone(root: &Path) -> Option<f64> {
    fs::read_dir(root)
        .ok()?
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("thermal_zone"))
        .filter_map(|e| read_trimmed(&e.path().join("temp"))?.parse::<i64>().ok())
        .filter(|milli| *milli > 0)
        .map(|milli| milli as f64 / 1000.0)
        .fold(None, |max: Option<f64>, c| Some(max.map_or(c, |m| m.max(c))))
}
