// Fans, temperature sensors and power rails

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    Auto,
    Forced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanStatus {
    pub id: usize,
    pub current_rpm: f64,
    pub min_rpm: f64,
    pub max_rpm: f64,
    pub target_rpm: f64,
    pub mode: FanMode,
}

impl FanStatus {
    /// Position of the current speed within [min, max], as a percentage.
    pub fn percent_of_max(&self) -> f64 {
        if self.max_rpm <= self.min_rpm {
            return 0.0;
        }
        ((self.current_rpm - self.min_rpm) / (self.max_rpm - self.min_rpm) * 100.0)
            .clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureReading {
    /// Four-character sensor key, e.g. "TC0P".
    pub key: String,
    pub label: String,
    pub celsius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalUsage {
    pub fans: Vec<FanStatus>,
    pub temperatures: Vec<TemperatureReading>,
    pub system_power_watts: Option<f64>,
    pub cpu_power_watts: Option<f64>,
    pub gpu_power_watts: Option<f64>,
    pub timestamp: u64,
}

impl ThermalUsage {
    pub fn zero() -> Self {
        Self {
            fans: vec![],
            temperatures: vec![],
            system_power_watts: None,
            cpu_power_watts: None,
            gpu_power_watts: None,
            timestamp: 0,
        }
    }

    fn temperature_of(&self, keys: &[&str]) -> Option<f64> {
        self.temperatures
            .iter()
            .find(|t| keys.contains(&t.key.as_str()))
            .map(|t| t.celsius)
    }

    pub fn cpu_temperature(&self) -> Option<f64> {
        self.temperature_of(&["TC0P", "Tp09"])
    }

    pub fn gpu_temperature(&self) -> Option<f64> {
        self.temperature_of(&["TG0P", "Tg05"])
    }

    pub fn fan_count(&self) -> usize {
        self.fans.len()
    }

    pub fn has_data(&self) -> bool {
        !self.fans.is_empty() || !self.temperatures.is_empty() || self.system_power_watts.is_some()
    }
}
