// Power source and thermal pressure

use tracing::instrument;

use super::{Monitor, clamp_percent};
use crate::counters::{CounterSource, PowerReading, PowerState, SysfsPowerSupply};
use crate::models::{BatteryUsage, PowerSourceKind, ThermalPressure, now_millis};

pub struct BatteryMonitor {
    source: Box<dyn CounterSource<Output = PowerReading>>,
}

impl Default for BatteryMonitor {
    fn default() -> Self {
        Self::new(SysfsPowerSupply::default())
    }
}

impl BatteryMonitor {
    pub fn new(source: impl CounterSource<Output = PowerReading> + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    #[instrument(level = "debug", skip(self), fields(monitor = "battery", operation = "snapshot"))]
    pub fn snapshot(&self) -> BatteryUsage {
        let timestamp = now_millis();
        let reading = self.source.read().unwrap_or_else(|e| {
            tracing::debug!(error = %e, operation = "read_power_source", "power source unavailable");
            PowerReading::default()
        });
        let thermal_state = reading
            .hottest_zone_celsius
            .map(ThermalPressure::from_celsius)
            .unwrap_or(ThermalPressure::Nominal);

        let Some(source) = reading.source else {
            return BatteryUsage::absent(thermal_state, timestamp);
        };

        let power_source = match source.state {
            PowerState::Ac => PowerSourceKind::Ac,
            PowerState::Battery => PowerSourceKind::Battery,
            PowerState::Ups => PowerSourceKind::Ups,
            PowerState::Unknown => PowerSourceKind::Unknown,
        };
        BatteryUsage {
            level: clamp_percent(source.level),
            is_charging: source.is_charging,
            is_plugged_in: source.state == PowerState::Ac,
            power_source,
            cycle_count: source.cycle_count,
            health: source.health.map(clamp_percent),
            time_remaining_secs: source.time_remaining_secs,
            is_present: true,
            has_battery: source.has_battery,
            thermal_state,
            timestamp,
        }
    }
}

impl Monitor for BatteryMonitor {
    type Snapshot = BatteryUsage;

    fn snapshot(&self) -> BatteryUsage {
        BatteryMonitor::snapshot(self)
    }
}
