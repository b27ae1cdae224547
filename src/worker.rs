// Monitor orchestrator: periodic sampling of every monitor, "current" snapshot,
// per-metric histories, and the periodic widget publish.
// Sampling runs on the blocking pool; the loop only suspends at the sleep boundary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::MonitorError;
use crate::history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
use crate::models::{
    BatteryUsage, CpuUsage, DiskUsage, GpuUsage, MemoryUsage, NetworkUsage, SystemStats,
    ThermalUsage, now_millis,
};
use crate::monitors::{
    BatteryMonitor, CpuMonitor, DiskMonitor, GpuMonitor, MemoryMonitor, NetworkMonitor,
    ThermalMonitor, lock_or_recover,
};
use crate::smc::SmcConnection;
use crate::widget::{self, SharedStore, WidgetSnapshot};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// One monitor per metric domain.
pub struct Monitors {
    pub cpu: CpuMonitor,
    pub memory: MemoryMonitor,
    pub gpu: GpuMonitor,
    pub network: NetworkMonitor,
    pub disk: DiskMonitor,
    pub battery: BatteryMonitor,
    pub thermal: Arc<ThermalMonitor>,
}

impl Monitors {
    /// Monitors over the platform's live counters. `smc` is the hardware
    /// channel opened once by the caller (see `smc::open`).
    pub fn live(smc: Option<Arc<dyn SmcConnection>>) -> Self {
        Self {
            cpu: CpuMonitor::default(),
            memory: MemoryMonitor::default(),
            gpu: GpuMonitor::default(),
            network: NetworkMonitor::default(),
            disk: DiskMonitor::default(),
            battery: BatteryMonitor::default(),
            thermal: Arc::new(ThermalMonitor::new(smc)),
        }
    }

    /// Sample every domain once into a composite snapshot.
    pub fn sample(&self) -> SystemStats {
        SystemStats {
            cpu: self.cpu.snapshot(),
            memory: self.memory.snapshot(),
            gpu: self.gpu.snapshot(),
            network: self.network.snapshot(),
            disk: self.disk.snapshot(),
            battery: self.battery.snapshot(),
            thermal: self.thermal.snapshot(),
            timestamp: now_millis(),
        }
    }
}

/// Bounded history per metric domain.
pub struct Histories {
    pub cpu: HistoryBuffer<CpuUsage>,
    pub memory: HistoryBuffer<MemoryUsage>,
    pub gpu: HistoryBuffer<GpuUsage>,
    pub network: HistoryBuffer<NetworkUsage>,
    pub disk: HistoryBuffer<DiskUsage>,
    pub battery: HistoryBuffer<BatteryUsage>,
    pub thermal: HistoryBuffer<ThermalUsage>,
}

impl Default for Histories {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl Histories {
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu: HistoryBuffer::new(capacity),
            memory: HistoryBuffer::new(capacity),
            gpu: HistoryBuffer::new(capacity),
            network: HistoryBuffer::new(capacity),
            disk: HistoryBuffer::new(capacity),
            battery: HistoryBuffer::new(capacity),
            thermal: HistoryBuffer::new(capacity),
        }
    }

    fn append(&self, stats: &SystemStats) {
        self.cpu.append(stats.cpu.clone());
        self.memory.append(stats.memory.clone());
        self.gpu.append(stats.gpu.clone());
        self.network.append(stats.network.clone());
        self.disk.append(stats.disk.clone());
        self.battery.append(stats.battery.clone());
        self.thermal.append(stats.thermal.clone());
    }

    pub fn resize(&self, capacity: usize) {
        self.cpu.resize(capacity);
        self.memory.resize(capacity);
        self.gpu.resize(capacity);
        self.network.resize(capacity);
        self.disk.resize(capacity);
        self.battery.resize(capacity);
        self.thermal.resize(capacity);
    }

    pub fn clear(&self) {
        self.cpu.clear();
        self.memory.clear();
        self.gpu.clear();
        self.network.clear();
        self.disk.clear();
        self.battery.clear();
        self.thermal.clear();
    }
}

/// Where and how often the condensed widget snapshot is written.
#[derive(Clone)]
pub struct WidgetPublishing {
    pub store: Arc<dyn SharedStore>,
    pub publish_every_ticks: u64,
    pub history_points: usize,
}

#[derive(Clone)]
pub struct MonitorSettings {
    pub refresh_interval: Duration,
    pub history_capacity: usize,
    pub widget: Option<WidgetPublishing>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            widget: None,
        }
    }
}

struct Shared {
    monitors: Monitors,
    histories: Histories,
    current: watch::Sender<Arc<SystemStats>>,
    refresh_interval_nanos: AtomicU64,
    ticks: AtomicU64,
    widget: Option<WidgetPublishing>,
    /// Serializes whole ticks (periodic vs. manual refresh).
    tick_lock: Mutex<()>,
}

impl Shared {
    fn refresh_interval(&self) -> Duration {
        Duration::from_nanos(self.refresh_interval_nanos.load(Ordering::Relaxed))
    }

    /// Sample, publish "current" as one replace, then append histories.
    fn tick(&self) -> Arc<SystemStats> {
        let _tick = lock_or_recover(&self.tick_lock);
        let stats = Arc::new(self.monitors.sample());
        self.current.send_replace(stats.clone());
        self.histories.append(&stats);

        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(w) = &self.widget
            && w.publish_every_ticks > 0
            && n % w.publish_every_ticks == 0
        {
            let cpu: Vec<f64> = self
                .histories
                .cpu
                .last_n(w.history_points)
                .iter()
                .map(|c| c.total_usage)
                .collect();
            let memory: Vec<f64> = self
                .histories
                .memory
                .last_n(w.history_points)
                .iter()
                .map(|m| m.usage_percentage())
                .collect();
            let snapshot = WidgetSnapshot::from_stats(&stats, &cpu, &memory, w.history_points);
            widget::publish(w.store.as_ref(), &snapshot);
        }
        stats
    }
}

struct Running {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

/// Owns all monitors and histories and drives the polling task.
pub struct SystemMonitor {
    shared: Arc<Shared>,
    task: Mutex<Option<Running>>,
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl SystemMonitor {
    pub fn new(monitors: Monitors, settings: MonitorSettings) -> Result<Self, MonitorError> {
        if settings.refresh_interval.is_zero() {
            return Err(MonitorError::InvalidSetting {
                name: "refresh_interval",
            });
        }
        if settings.history_capacity == 0 {
            return Err(MonitorError::InvalidSetting {
                name: "history_capacity",
            });
        }
        let (current, _) = watch::channel(Arc::new(SystemStats::zero()));
        Ok(Self {
            shared: Arc::new(Shared {
                monitors,
                histories: Histories::new(settings.history_capacity),
                current,
                refresh_interval_nanos: AtomicU64::new(nanos(settings.refresh_interval)),
                ticks: AtomicU64::new(0),
                widget: settings.widget,
                tick_lock: Mutex::new(()),
            }),
            task: Mutex::new(None),
        })
    }

    /// Begin periodic sampling. A second call while running is a no-op.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut task = lock_or_recover(&self.task);
        if task.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(
            run(self.shared.clone(), shutdown_rx).instrument(tracing::debug_span!("system_monitor")),
        );
        *task = Some(Running {
            handle,
            shutdown_tx,
        });
        tracing::debug!(operation = "start", "System monitor started");
    }

    /// Cancel the polling task. An in-flight tick completes; the pending sleep
    /// is cut short. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(running) = lock_or_recover(&self.task).take() {
            let _ = running.shutdown_tx.send(());
        }
    }

    /// Stop and wait for the polling task to exit.
    pub async fn shutdown(&self) {
        let running = lock_or_recover(&self.task).take();
        if let Some(Running {
            handle,
            shutdown_tx,
        }) = running
        {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, operation = "shutdown", "Polling task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.task)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// One manual tick outside the periodic schedule.
    pub async fn refresh_now(&self) -> Arc<SystemStats> {
        let shared = self.shared.clone();
        match tokio::task::spawn_blocking(move || shared.tick()).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, operation = "refresh_now", "Manual refresh failed");
                self.current()
            }
        }
    }

    /// Latest composite snapshot (all-zero before the first tick).
    pub fn current(&self) -> Arc<SystemStats> {
        self.shared.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SystemStats>> {
        self.shared.current.subscribe()
    }

    pub fn histories(&self) -> &Histories {
        &self.shared.histories
    }

    pub fn refresh_interval(&self) -> Duration {
        self.shared.refresh_interval()
    }

    /// Takes effect on the next sleep.
    pub fn set_refresh_interval(&self, interval: Duration) -> Result<(), MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidSetting {
                name: "refresh_interval",
            });
        }
        self.shared
            .refresh_interval_nanos
            .store(nanos(interval), Ordering::Relaxed);
        Ok(())
    }

    /// Resize every history buffer; shrinking trims immediately.
    pub fn set_history_capacity(&self, capacity: usize) -> Result<(), MonitorError> {
        if capacity == 0 {
            return Err(MonitorError::InvalidSetting {
                name: "history_capacity",
            });
        }
        self.shared.histories.resize(capacity);
        Ok(())
    }

    pub fn thermal(&self) -> Arc<ThermalMonitor> {
        self.shared.monitors.thermal.clone()
    }

    pub fn can_control_fans(&self) -> bool {
        self.shared.monitors.thermal.can_control_fans()
    }

    pub fn set_fan_speed(&self, index: usize, target_rpm: f64) -> Result<f64, MonitorError> {
        self.shared.monitors.thermal.set_fan_speed(index, target_rpm)
    }

    pub fn set_fan_auto(&self, index: usize) -> Result<(), MonitorError> {
        self.shared.monitors.thermal.set_fan_auto(index)
    }

    pub fn restore_all_fans_to_auto(&self) -> Result<usize, MonitorError> {
        self.shared.monitors.thermal.restore_all_fans_to_auto()
    }
}

impl Drop for SystemMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(shared: Arc<Shared>, mut shutdown_rx: oneshot::Receiver<()>) {
    loop {
        let tick_shared = shared.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || tick_shared.tick()).await {
            tracing::warn!(error = %e, operation = "tick", "Sampling tick failed");
        }
        tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!("System monitor shutting down");
                break;
            }
            _ = tokio::time::sleep(shared.refresh_interval()) => {}
        }
    }
}
