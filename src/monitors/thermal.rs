// Fans, temperatures and power rails over the SMC channel, plus fan control.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::instrument;

use super::{Monitor, lock_or_recover};
use crate::error::MonitorError;
use crate::models::{FanMode, FanStatus, TemperatureReading, ThermalUsage, now_millis};
use crate::smc::codec::{self, FLT, FPE2, UI8};
use crate::smc::{FourCc, SmcConnection};

/// Temperature sensor catalog checked once at discovery.
pub const TEMPERATURE_SENSORS: &[(&[u8; 4], &str)] = &[
    // CPU
    (b"TC0P", "CPU Proximity"),
    (b"TC0D", "CPU Die"),
    (b"TC0E", "CPU Die 2"),
    (b"TC0F", "CPU Die 3"),
    (b"TC1C", "CPU Core 1"),
    (b"TC2C", "CPU Core 2"),
    (b"TC3C", "CPU Core 3"),
    (b"TC4C", "CPU Core 4"),
    (b"TC5C", "CPU Core 5"),
    (b"TC6C", "CPU Core 6"),
    (b"TC7C", "CPU Core 7"),
    (b"TC8C", "CPU Core 8"),
    // Apple Silicon efficiency / performance cores
    (b"Tp09", "CPU Efficiency Core 1"),
    (b"Tp0T", "CPU Efficiency Core 2"),
    (b"Tp01", "CPU Performance Core 1"),
    (b"Tp05", "CPU Performance Core 2"),
    (b"Tp0D", "CPU Performance Core 3"),
    (b"Tp0H", "CPU Performance Core 4"),
    (b"Tp0L", "CPU Performance Core 5"),
    (b"Tp0P", "CPU Performance Core 6"),
    // GPU
    (b"TG0P", "GPU Proximity"),
    (b"TG0D", "GPU Die"),
    (b"Tg05", "GPU 1"),
    (b"Tg0D", "GPU 2"),
    (b"Tg0f", "GPU 3"),
    // Storage
    (b"TH0A", "SSD A"),
    (b"TH0B", "SSD B"),
    (b"TH0a", "SSD Slot A"),
    (b"TH0b", "SSD Slot B"),
    // Ambient and board
    (b"TA0P", "Ambient"),
    (b"TA1P", "Ambient 2"),
    (b"TB0T", "Battery"),
    (b"TB1T", "Battery 2"),
    (b"TW0P", "Wireless"),
    (b"Tm0P", "Mainboard"),
    (b"Tp0C", "Power Supply"),
    (b"TM0P", "Memory Proximity"),
    (b"TN0P", "Northbridge Proximity"),
];

const FAN_COUNT_KEY: FourCc = FourCc::from_bytes(b"FNum");
const MAX_FANS: usize = 10;
const DEFAULT_MAX_RPM: f64 = 6500.0;

const SYSTEM_POWER_KEY: FourCc = FourCc::from_bytes(b"PSTR");
const CPU_POWER_KEY: FourCc = FourCc::from_bytes(b"PCPC");
const GPU_POWER_KEY: FourCc = FourCc::from_bytes(b"PCPG");

const MODE_AUTO: u8 = 0;
const MODE_FORCED: u8 = 1;

#[derive(Debug, Clone)]
struct Sensor {
    key: FourCc,
    label: &'static str,
}

#[derive(Default)]
struct ThermalState {
    /// Locked in after the first discovery pass that finds anything.
    sensors: Option<Vec<Sensor>>,
    temperatures: HashMap<FourCc, f64>,
    system_power: Option<f64>,
    cpu_power: Option<f64>,
    gpu_power: Option<f64>,
}

pub struct ThermalMonitor {
    smc: Option<Arc<dyn SmcConnection>>,
    state: Mutex<ThermalState>,
    fan_control: OnceLock<bool>,
}

impl ThermalMonitor {
    /// `None` means no hardware channel; every snapshot is then empty.
    pub fn new(smc: Option<Arc<dyn SmcConnection>>) -> Self {
        Self {
            smc,
            state: Mutex::new(ThermalState::default()),
            fan_control: OnceLock::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.smc.is_some()
    }

    #[instrument(level = "debug", skip(self), fields(monitor = "thermal", operation = "snapshot"))]
    pub fn snapshot(&self) -> ThermalUsage {
        let timestamp = now_millis();
        let Some(smc) = self.smc.as_deref() else {
            return ThermalUsage {
                timestamp,
                ..ThermalUsage::zero()
            };
        };

        let fans = read_fans(smc);
        let mut state = lock_or_recover(&self.state);
        let temperatures = read_temperatures(smc, &mut state);
        refresh_power(smc, &mut state);

        ThermalUsage {
            fans,
            temperatures,
            system_power_watts: state.system_power,
            cpu_power_watts: state.cpu_power,
            gpu_power_watts: state.gpu_power,
            timestamp,
        }
    }

    /// Whether fan writes are permitted. Probed once with a no-op write of
    /// fan 0's current mode byte.
    pub fn can_control_fans(&self) -> bool {
        *self.fan_control.get_or_init(|| {
            let Some(smc) = self.smc.as_deref() else {
                return false;
            };
            let Some(mode_key) = FourCc::fan(0, "Md") else {
                return false;
            };
            let current = smc
                .read_key(mode_key)
                .ok()
                .and_then(|v| v.bytes.first().copied())
                .unwrap_or(MODE_AUTO);
            match smc.write_key(mode_key, UI8, &[current]) {
                Ok(()) => {
                    tracing::info!(operation = "check_fan_control", "Fan control available");
                    true
                }
                Err(e) => {
                    tracing::info!(error = %e, operation = "check_fan_control", "Fan control unavailable");
                    false
                }
            }
        })
    }

    fn controllable(&self) -> Result<&dyn SmcConnection, MonitorError> {
        if !self.can_control_fans() {
            return Err(MonitorError::FanControlUnavailable);
        }
        self.smc.as_deref().ok_or(MonitorError::FanControlUnavailable)
    }

    /// Pin a fan to `target_rpm`, clamped to the fan's [min, max]. Returns the
    /// RPM actually written. The target is encoded in whatever type the
    /// controller reports for the existing target key.
    #[instrument(skip(self), fields(monitor = "thermal", operation = "set_fan_speed"))]
    pub fn set_fan_speed(&self, index: usize, target_rpm: f64) -> Result<f64, MonitorError> {
        let smc = self.controllable()?;
        let count = fan_count(smc);
        if index >= count {
            return Err(MonitorError::NoSuchFan { index, count });
        }
        let key = |suffix| FourCc::fan(index, suffix).ok_or(MonitorError::NoSuchFan { index, count });

        let min = read_f64(smc, key("Mn")?).unwrap_or(0.0);
        let max = read_f64(smc, key("Mx")?).unwrap_or(DEFAULT_MAX_RPM);
        let clamped = target_rpm.min(max).max(min);

        let target_key = key("Tg")?;
        let existing = smc.read_key(target_key)?;

        smc.write_key(key("Md")?, UI8, &[MODE_FORCED])?;
        if existing.data_type == FLT {
            smc.write_key(target_key, FLT, &codec::encode_flt(clamped))?;
        } else {
            smc.write_key(target_key, FPE2, &codec::encode_fpe2(clamped))?;
        }
        tracing::debug!(fan = index, requested = target_rpm, written = clamped, "Fan forced");
        Ok(clamped)
    }

    /// Return a fan to automatic control (single mode-flag write).
    #[instrument(skip(self), fields(monitor = "thermal", operation = "set_fan_auto"))]
    pub fn set_fan_auto(&self, index: usize) -> Result<(), MonitorError> {
        let smc = self.controllable()?;
        let count = fan_count(smc);
        if index >= count {
            return Err(MonitorError::NoSuchFan { index, count });
        }
        let key = FourCc::fan(index, "Md").ok_or(MonitorError::NoSuchFan { index, count })?;
        smc.write_key(key, UI8, &[MODE_AUTO])?;
        Ok(())
    }

    /// Restore every fan to automatic mode. Returns the number of fans restored;
    /// keeps going past individual failures and reports the last one.
    pub fn restore_all_fans_to_auto(&self) -> Result<usize, MonitorError> {
        let smc = self.controllable()?;
        let count = fan_count(smc);
        let mut last_error = None;
        let mut restored = 0;
        for index in 0..count {
            match self.set_fan_auto(index) {
                Ok(()) => restored += 1,
                Err(e) => {
                    tracing::warn!(error = %e, fan = index, operation = "restore_fan_auto", "Failed to restore fan");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(restored),
        }
    }
}

impl Monitor for ThermalMonitor {
    type Snapshot = ThermalUsage;

    fn snapshot(&self) -> ThermalUsage {
        ThermalMonitor::snapshot(self)
    }
}

/// Restores all fans to automatic mode when dropped, including on panic unwind.
pub struct FanRestoreGuard {
    thermal: Arc<ThermalMonitor>,
}

impl FanRestoreGuard {
    pub fn new(thermal: Arc<ThermalMonitor>) -> Self {
        Self { thermal }
    }
}

impl Drop for FanRestoreGuard {
    fn drop(&mut self) {
        if !self.thermal.is_available() {
            return;
        }
        match self.thermal.restore_all_fans_to_auto() {
            Ok(n) => tracing::debug!(fans = n, operation = "restore_fans", "Fans restored to auto"),
            Err(MonitorError::FanControlUnavailable) => {}
            Err(e) => tracing::warn!(error = %e, operation = "restore_fans", "Fan restore incomplete"),
        }
    }
}

fn read_f64(smc: &dyn SmcConnection, key: FourCc) -> Option<f64> {
    smc.read_key(key).ok().and_then(|v| codec::decode_value(&v))
}

fn fan_count(smc: &dyn SmcConnection) -> usize {
    match read_f64(smc, FAN_COUNT_KEY) {
        Some(n) if n > 0.0 && n <= MAX_FANS as f64 => n as usize,
        _ => 0,
    }
}

fn read_fans(smc: &dyn SmcConnection) -> Vec<FanStatus> {
    (0..fan_count(smc))
        .map(|id| {
            let field = |suffix: &str| {
                FourCc::fan(id, suffix)
                    .and_then(|key| read_f64(smc, key))
                    .unwrap_or(0.0)
            };
            FanStatus {
                id,
                current_rpm: field("Ac"),
                min_rpm: field("Mn"),
                max_rpm: field("Mx"),
                target_rpm: field("Tg"),
                mode: if field("Md") > 0.0 {
                    FanMode::Forced
                } else {
                    FanMode::Auto
                },
            }
        })
        .collect()
}

fn discover(smc: &dyn SmcConnection) -> Vec<Sensor> {
    TEMPERATURE_SENSORS
        .iter()
        .map(|&(code, label)| Sensor {
            key: FourCc::from_bytes(code),
            label,
        })
        .filter(|s| smc.read_key(s.key).is_ok())
        .collect()
}

/// Read the discovered sensors, caching valid (0, 200) °C values and always
/// emitting the cached last-known-good reading.
fn read_temperatures(smc: &dyn SmcConnection, state: &mut ThermalState) -> Vec<TemperatureReading> {
    let sensors = match state.sensors.clone() {
        Some(sensors) => sensors,
        None => {
            let found = discover(smc);
            if !found.is_empty() {
                tracing::info!(sensors = found.len(), operation = "discover_sensors", "Temperature sensors discovered");
                state.sensors = Some(found.clone());
            }
            found
        }
    };

    sensors
        .iter()
        .filter_map(|sensor| {
            if let Some(celsius) = read_f64(smc, sensor.key)
                && celsius > 0.0
                && celsius < 200.0
            {
                state.temperatures.insert(sensor.key, celsius);
            }
            state
                .temperatures
                .get(&sensor.key)
                .map(|&celsius| TemperatureReading {
                    key: sensor.key.to_string(),
                    label: sensor.label.to_string(),
                    celsius,
                })
        })
        .collect()
}

/// Update each power channel when a decode strategy succeeds; otherwise keep
/// the cached value.
fn refresh_power(smc: &dyn SmcConnection, state: &mut ThermalState) {
    let watts = |key| {
        smc.read_key(key)
            .ok()
            .and_then(|v| codec::decode_power_watts(&v))
    };
    if let Some(w) = watts(SYSTEM_POWER_KEY) {
        state.system_power = Some(w);
    }
    if let Some(w) = watts(CPU_POWER_KEY) {
        state.cpu_power = Some(w);
    }
    if let Some(w) = watts(GPU_POWER_KEY) {
        state.gpu_power = Some(w);
    }
}
