use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use vitals::monitors::FanRestoreGuard;
use vitals::process_repo::{self, PollerSettings, ProcessAccess, ProcessPoller};
use vitals::widget::FileSharedStore;
use vitals::worker::{MonitorSettings, Monitors, SystemMonitor, WidgetPublishing};
use vitals::{config, shutdown, smc, version};

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(version = %version::describe(), "Starting");

    let widget = app_config.widget.enabled.then(|| WidgetPublishing {
        store: Arc::new(FileSharedStore::new(&app_config.widget.path)),
        publish_every_ticks: app_config.widget.publish_every_ticks,
        history_points: app_config.widget.history_points,
    });
    let monitor = Arc::new(SystemMonitor::new(
        Monitors::live(smc::open()),
        MonitorSettings {
            refresh_interval: app_config.monitoring.refresh_interval(),
            history_capacity: app_config.monitoring.history_capacity,
            widget,
        },
    )?);
    let fan_guard = FanRestoreGuard::new(monitor.thermal());

    let access = ProcessAccess::detect();
    tracing::info!(access = ?access, "Process listing strategy selected");
    let poller = ProcessPoller::new(
        process_repo::provider_for(access),
        PollerSettings {
            poll_interval: app_config.processes.poll_interval(),
            selected_history_capacity: app_config.processes.selected_history_capacity,
        },
    )?;

    monitor.start();
    poller.start();

    let stats_log_interval = Duration::from_secs(app_config.monitoring.stats_log_interval_secs);
    tokio::select! {
        _ = log_stats(&monitor, &poller, stats_log_interval) => {}
        signal = shutdown::shutdown_signal() => {
            tracing::info!(signal, "Received shutdown signal");
        }
    }

    monitor.shutdown().await;
    poller.shutdown().await;
    drop(fan_guard);
    Ok(())
}

/// Periodic INFO summary of the latest tick.
async fn log_stats(monitor: &SystemMonitor, poller: &ProcessPoller, every: Duration) {
    let mut tick = tokio::time::interval(every);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tick.tick().await;
    loop {
        tick.tick().await;
        let stats = monitor.current();
        tracing::info!(
            cpu_percent = stats.cpu.total_usage,
            memory_percent = stats.memory.usage_percentage(),
            net_in_bps = stats.network.bytes_in_per_second as u64,
            net_out_bps = stats.network.bytes_out_per_second as u64,
            disk_read_bps = stats.disk.read_per_second as u64,
            disk_write_bps = stats.disk.write_per_second as u64,
            gpu_percent = stats.gpu.utilization,
            cpu_temp = ?stats.thermal.cpu_temperature(),
            processes = poller.processes().len(),
            "app stats"
        );
    }
}
