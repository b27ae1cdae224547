// Battery / power source snapshot

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSourceKind {
    Battery,
    Ac,
    Ups,
    Unknown,
}

impl PowerSourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            PowerSourceKind::Battery => "Battery",
            PowerSourceKind::Ac => "AC Power",
            PowerSourceKind::Ups => "UPS",
            PowerSourceKind::Unknown => "Unknown",
        }
    }
}

/// System-wide thermal pressure, coarsest to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalPressure {
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl ThermalPressure {
    /// Maps the hottest thermal zone reading onto a pressure level.
    pub fn from_celsius(celsius: f64) -> Self {
        if celsius < 70.0 {
            ThermalPressure::Nominal
        } else if celsius < 85.0 {
            ThermalPressure::Fair
        } else if celsius < 95.0 {
            ThermalPressure::Serious
        } else {
            ThermalPressure::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryUsage {
    pub level: f64,
    pub is_charging: bool,
    pub is_plugged_in: bool,
    pub power_source: PowerSourceKind,
    pub cycle_count: Option<u32>,
    /// Full-charge capacity as a percentage of design capacity.
    pub health: Option<f64>,
    pub time_remaining_secs: Option<u64>,
    /// A power-source descriptor was found at all.
    pub is_present: bool,
    /// The descriptor includes an internal battery.
    pub has_battery: bool,
    pub thermal_state: ThermalPressure,
    pub timestamp: u64,
}

impl BatteryUsage {
    /// Reading for machines without any power-source descriptor.
    pub fn absent(thermal_state: ThermalPressure, timestamp: u64) -> Self {
        Self {
            level: 0.0,
            is_charging: false,
            is_plugged_in: false,
            power_source: PowerSourceKind::Unknown,
            cycle_count: None,
            health: None,
            time_remaining_secs: None,
            is_present: false,
            has_battery: false,
            thermal_state,
            timestamp,
        }
    }

    pub fn zero() -> Self {
        Self::absent(ThermalPressure::Nominal, 0)
    }
}
