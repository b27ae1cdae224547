use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitoring: MonitoringConfig,
    pub processes: ProcessesConfig,
    pub widget: WidgetConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub refresh_interval_ms: u64,
    /// Entries kept per metric history.
    pub history_capacity: usize,
    /// How often to log the current-stats summary at INFO level.
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 1000,
            history_capacity: 600,
            stats_log_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessesConfig {
    pub poll_interval_ms: u64,
    pub selected_history_capacity: usize,
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            selected_history_capacity: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub enabled: bool,
    /// Directory of the shared store the widget reads.
    pub path: String,
    pub publish_every_ticks: u64,
    /// CPU / memory history points included in each snapshot.
    pub history_points: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "data/widget".into(),
            publish_every_ticks: 5,
            history_points: 60,
        }
    }
}

impl MonitoringConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl ProcessesConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Load from `CONFIG_FILE` (default `config.toml`). A missing file yields
    /// the defaults; an unreadable or invalid one is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        match std::fs::read_to_string(&path) {
            Ok(s) => Self::load_from_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path, "Config file not found, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(anyhow::anyhow!("reading {}: {}", path, e)),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.monitoring.refresh_interval_ms > 0,
            "monitoring.refresh_interval_ms must be > 0, got {}",
            self.monitoring.refresh_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.history_capacity > 0,
            "monitoring.history_capacity must be > 0, got {}",
            self.monitoring.history_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.processes.poll_interval_ms > 0,
            "processes.poll_interval_ms must be > 0, got {}",
            self.processes.poll_interval_ms
        );
        anyhow::ensure!(
            self.processes.selected_history_capacity > 0,
            "processes.selected_history_capacity must be > 0, got {}",
            self.processes.selected_history_capacity
        );
        if self.widget.enabled {
            anyhow::ensure!(!self.widget.path.is_empty(), "widget.path must be non-empty");
            anyhow::ensure!(
                self.widget.publish_every_ticks > 0,
                "widget.publish_every_ticks must be > 0, got {}",
                self.widget.publish_every_ticks
            );
            anyhow::ensure!(
                self.widget.history_points > 0,
                "widget.history_points must be > 0, got {}",
                self.widget.history_points
            );
        }
        Ok(())
    }
}
