// Per-metric monitors over scripted counters

mod common;

use std::time::{Duration, Instant};

use common::{Fixed, Scripted, cpu_sample, memory_counters, ticks};
use vitals::counters::{
    DiskCounters, NetworkCounters, PowerReading, PowerState, RawGpuDevice, RawPowerSource,
};
use vitals::models::{PowerSourceKind, ThermalPressure};
use vitals::monitors::{
    BatteryMonitor, CpuMonitor, DiskMonitor, GpuMonitor, MemoryMonitor, Monitor, NetworkMonitor,
};

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn cpu_usage_from_tick_deltas() {
    let monitor = CpuMonitor::new(Scripted::new(vec![
        Some(cpu_sample(
            ticks(100, 50, 850, 0),
            vec![ticks(50, 25, 425, 0), ticks(50, 25, 425, 0)],
        )),
        Some(cpu_sample(
            ticks(150, 70, 980, 0),
            vec![ticks(80, 35, 485, 0), ticks(70, 35, 495, 0)],
        )),
    ]));

    let first = monitor.snapshot();
    approx(first.total_usage, 0.0);
    approx(first.idle_usage, 100.0);
    assert_eq!(first.core_usages.len(), 2);

    let second = monitor.snapshot();
    approx(second.user_usage, 25.0);
    approx(second.system_usage, 10.0);
    approx(second.idle_usage, 65.0);
    approx(second.total_usage, 35.0);
    assert_eq!(second.core_usages.len(), 2);
    approx(second.core_usages[0].usage, 40.0);
    approx(second.core_usages[1].usage, 30.0);
}

#[test]
fn cpu_nice_counts_as_user() {
    let monitor = CpuMonitor::new(Scripted::new(vec![
        Some(cpu_sample(ticks(0, 0, 0, 0), vec![])),
        Some(cpu_sample(ticks(10, 0, 80, 10), vec![])),
    ]));
    monitor.snapshot();
    let usage = monitor.snapshot();
    approx(usage.user_usage, 20.0);
    approx(usage.total_usage, 20.0);
    approx(usage.idle_usage, 80.0);
}

#[test]
fn cpu_core_count_change_zeroes_cores() {
    let monitor = CpuMonitor::new(Scripted::new(vec![
        Some(cpu_sample(ticks(10, 10, 80, 0), vec![ticks(5, 5, 40, 0)])),
        Some(cpu_sample(
            ticks(20, 20, 160, 0),
            vec![ticks(10, 10, 80, 0), ticks(0, 0, 0, 0), ticks(0, 0, 0, 0)],
        )),
    ]));
    monitor.snapshot();
    let usage = monitor.snapshot();
    assert_eq!(usage.core_usages.len(), 3);
    assert!(usage.core_usages.iter().all(|c| c.usage == 0.0));
    approx(usage.total_usage, 20.0);
}

#[test]
fn cpu_read_failure_is_neutral() {
    let monitor = CpuMonitor::new(Scripted::new(vec![None]));
    let usage = monitor.snapshot();
    approx(usage.total_usage, 0.0);
    approx(usage.idle_usage, 100.0);
    assert!(usage.core_usages.is_empty());
    assert!(usage.timestamp > 0);
}

#[test]
fn cpu_counter_regression_yields_no_negative_usage() {
    let monitor = CpuMonitor::new(Scripted::new(vec![
        Some(cpu_sample(ticks(500, 500, 500, 0), vec![])),
        Some(cpu_sample(ticks(100, 100, 100, 0), vec![])),
    ]));
    monitor.snapshot();
    let usage = monitor.snapshot();
    assert!(usage.total_usage >= 0.0 && usage.total_usage <= 100.0);
    assert!(usage.idle_usage >= 0.0 && usage.idle_usage <= 100.0);
}

#[test]
fn memory_snapshot_maps_partition() {
    let monitor = MemoryMonitor::new(Fixed(memory_counters()));
    let usage = monitor.snapshot();
    assert_eq!(usage.total_physical, 10_000);
    assert_eq!(usage.used(), 5_000);
    assert!(usage.used() <= usage.total_physical);
    approx(usage.usage_percentage(), 50.0);
}

#[test]
fn memory_read_failure_is_zero() {
    let monitor = MemoryMonitor::new(Scripted::new(vec![None]));
    let usage = monitor.snapshot();
    assert_eq!(usage.total_physical, 0);
    approx(usage.usage_percentage(), 0.0);
}

fn disk(read: u64, written: u64) -> Option<DiskCounters> {
    Some(DiskCounters {
        bytes_read: read,
        bytes_written: written,
    })
}

#[test]
fn disk_rates_from_counter_deltas() {
    let monitor = DiskMonitor::new(Scripted::new(vec![disk(1000, 500), disk(3000, 500)]));
    let t0 = Instant::now();

    let first = monitor.snapshot_at(t0);
    approx(first.read_per_second, 0.0);
    approx(first.write_per_second, 0.0);
    assert_eq!(first.bytes_read, 1000);

    let second = monitor.snapshot_at(t0 + Duration::from_secs(2));
    approx(second.read_per_second, 1000.0);
    approx(second.write_per_second, 0.0);
    assert_eq!(second.bytes_read, 3000);
}

#[test]
fn disk_counter_reset_reports_zero_rate() {
    let monitor = DiskMonitor::new(Scripted::new(vec![
        disk(5000, 5000),
        disk(100, 200),
        disk(1100, 1200),
    ]));
    let t0 = Instant::now();
    monitor.snapshot_at(t0);
    let reset = monitor.snapshot_at(t0 + Duration::from_secs(1));
    approx(reset.read_per_second, 0.0);
    approx(reset.write_per_second, 0.0);
    let after = monitor.snapshot_at(t0 + Duration::from_secs(2));
    approx(after.read_per_second, 1000.0);
    approx(after.write_per_second, 1000.0);
}

#[test]
fn network_rates_from_counter_deltas() {
    let monitor = NetworkMonitor::new(Scripted::new(vec![
        Some(NetworkCounters {
            bytes_in: 10_000,
            bytes_out: 2_000,
        }),
        Some(NetworkCounters {
            bytes_in: 14_000,
            bytes_out: 2_500,
        }),
    ]));
    let t0 = Instant::now();
    approx(monitor.snapshot_at(t0).bytes_in_per_second, 0.0);
    let usage = monitor.snapshot_at(t0 + Duration::from_millis(500));
    approx(usage.bytes_in_per_second, 8_000.0);
    approx(usage.bytes_out_per_second, 1_000.0);
    assert_eq!(usage.bytes_in, 14_000);
}

#[test]
fn network_same_instant_reports_zero_rate() {
    let monitor = NetworkMonitor::new(Scripted::new(vec![
        Some(NetworkCounters {
            bytes_in: 0,
            bytes_out: 0,
        }),
        Some(NetworkCounters {
            bytes_in: 1_000,
            bytes_out: 1_000,
        }),
    ]));
    let t0 = Instant::now();
    monitor.snapshot_at(t0);
    approx(monitor.snapshot_at(t0).bytes_in_per_second, 0.0);
}

fn gpu(name: &str, utilization: f64) -> RawGpuDevice {
    RawGpuDevice {
        name: name.to_string(),
        utilization,
        vram_used: None,
        vram_total: None,
    }
}

#[test]
fn gpu_utilization_is_busiest_device() {
    let monitor = GpuMonitor::new(Fixed(vec![gpu("i915", 30.0), gpu("amdgpu", 80.0)]));
    let usage = monitor.snapshot();
    approx(usage.utilization, 80.0);
    assert_eq!(usage.devices.len(), 2);
    assert_eq!(usage.devices[1].id, 1);
    assert_eq!(usage.devices[1].name, "amdgpu");
    assert!(usage.is_available());
}

#[test]
fn gpu_values_are_clamped() {
    let monitor = GpuMonitor::new(Fixed(vec![gpu("card0", 130.0)]));
    approx(monitor.snapshot().utilization, 100.0);
}

#[test]
fn gpu_absent_is_zero() {
    let monitor = GpuMonitor::new(Scripted::<Vec<RawGpuDevice>>::new(vec![None]));
    let usage = monitor.snapshot();
    approx(usage.utilization, 0.0);
    assert!(!usage.is_available());
}

#[test]
fn battery_absent_without_descriptor() {
    let monitor = BatteryMonitor::new(Fixed(PowerReading::default()));
    let usage = monitor.snapshot();
    assert!(!usage.is_present);
    assert!(!usage.has_battery);
    assert_eq!(usage.power_source, PowerSourceKind::Unknown);
    assert_eq!(usage.thermal_state, ThermalPressure::Nominal);
}

#[test]
fn battery_descriptor_is_normalized() {
    let monitor = BatteryMonitor::new(Fixed(PowerReading {
        source: Some(RawPowerSource {
            level: 80.0,
            is_charging: true,
            state: PowerState::Ac,
            has_battery: true,
            cycle_count: Some(312),
            health: Some(104.0),
            time_remaining_secs: None,
        }),
        hottest_zone_celsius: Some(88.0),
    }));
    let usage = monitor.snapshot();
    assert!(usage.is_present);
    assert!(usage.has_battery);
    assert!(usage.is_plugged_in);
    assert!(usage.is_charging);
    assert_eq!(usage.power_source, PowerSourceKind::Ac);
    assert_eq!(usage.cycle_count, Some(312));
    assert_eq!(usage.health, Some(100.0));
    approx(usage.level, 80.0);
    assert_eq!(usage.thermal_state, ThermalPressure::Serious);
}

#[test]
fn battery_on_battery_power_is_unplugged() {
    let monitor = BatteryMonitor::new(Fixed(PowerReading {
        source: Some(RawPowerSource {
            level: 42.0,
            is_charging: false,
            state: PowerState::Battery,
            has_battery: true,
            cycle_count: None,
            health: None,
            time_remaining_secs: Some(5400),
        }),
        hottest_zone_celsius: None,
    }));
    let usage = monitor.snapshot();
    assert!(!usage.is_plugged_in);
    assert_eq!(usage.power_source, PowerSourceKind::Battery);
    assert_eq!(usage.time_remaining_secs, Some(5400));
}

#[test]
fn monitor_trait_delegates_to_snapshot() {
    fn through_trait<M: Monitor>(m: &M) -> M::Snapshot {
        m.snapshot()
    }
    let monitor = MemoryMonitor::new(Fixed(memory_counters()));
    assert_eq!(through_trait(&monitor).total_physical, 10_000);
}
