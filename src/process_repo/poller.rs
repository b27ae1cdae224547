// Background process-list polling with selected-process history

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::ProcessProvider;
use crate::error::MonitorError;
use crate::history::HistoryBuffer;
use crate::models::{ProcessEntry, ProcessMetricSample, now_millis};
use crate::monitors::lock_or_recover;

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub poll_interval: Duration,
    pub selected_history_capacity: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            selected_history_capacity: 120,
        }
    }
}

#[derive(Default)]
struct Selection {
    /// Pid the caller selected.
    pid: Option<u32>,
    /// Pid the history currently belongs to.
    tracked: Option<u32>,
}

struct Shared {
    provider: Box<dyn ProcessProvider>,
    processes: watch::Sender<Arc<Vec<ProcessEntry>>>,
    selection: Mutex<Selection>,
    history: HistoryBuffer<ProcessMetricSample>,
    poll_interval: Duration,
}

impl Shared {
    fn poll(&self) -> Arc<Vec<ProcessEntry>> {
        let entries = Arc::new(self.provider.list_processes());
        self.record_selected(&entries);
        self.processes.send_replace(entries.clone());
        entries
    }

    /// Extend the selected process's history; reset it when the selection
    /// changes, clear the selection when the process is gone.
    fn record_selected(&self, entries: &[ProcessEntry]) {
        let mut selection = lock_or_recover(&self.selection);
        let found = selection
            .pid
            .and_then(|pid| entries.iter().find(|e| e.pid == pid));
        match found {
            Some(entry) => {
                if selection.tracked != Some(entry.pid) {
                    self.history.clear();
                    selection.tracked = Some(entry.pid);
                }
                self.history.append(ProcessMetricSample {
                    timestamp: now_millis(),
                    cpu_usage: entry.cpu_usage,
                    memory_bytes: entry.memory_bytes,
                });
            }
            None => {
                self.history.clear();
                selection.tracked = None;
                selection.pid = None;
            }
        }
    }
}

struct Running {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

/// Polls a `ProcessProvider` on its own interval, independent of the metric loop.
pub struct ProcessPoller {
    shared: Arc<Shared>,
    task: Mutex<Option<Running>>,
}

impl ProcessPoller {
    pub fn new(
        provider: Box<dyn ProcessProvider>,
        settings: PollerSettings,
    ) -> Result<Self, MonitorError> {
        if settings.poll_interval.is_zero() {
            return Err(MonitorError::InvalidSetting {
                name: "poll_interval",
            });
        }
        if settings.selected_history_capacity == 0 {
            return Err(MonitorError::InvalidSetting {
                name: "selected_history_capacity",
            });
        }
        let (processes, _) = watch::channel(Arc::new(Vec::new()));
        Ok(Self {
            shared: Arc::new(Shared {
                provider,
                processes,
                selection: Mutex::new(Selection::default()),
                history: HistoryBuffer::new(settings.selected_history_capacity),
                poll_interval: settings.poll_interval,
            }),
            task: Mutex::new(None),
        })
    }

    /// Idempotent; must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut task = lock_or_recover(&self.task);
        if task.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(
            run(self.shared.clone(), shutdown_rx).instrument(tracing::debug_span!("process_poller")),
        );
        *task = Some(Running {
            handle,
            shutdown_tx,
        });
    }

    pub fn stop(&self) {
        if let Some(running) = lock_or_recover(&self.task).take() {
            let _ = running.shutdown_tx.send(());
        }
    }

    pub async fn shutdown(&self) {
        let running = lock_or_recover(&self.task).take();
        if let Some(Running {
            handle,
            shutdown_tx,
        }) = running
        {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, operation = "shutdown", "Process poller ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.task)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    pub async fn refresh_now(&self) -> Arc<Vec<ProcessEntry>> {
        let shared = self.shared.clone();
        match tokio::task::spawn_blocking(move || shared.poll()).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, operation = "refresh_now", "Process refresh failed");
                self.processes()
            }
        }
    }

    pub fn processes(&self) -> Arc<Vec<ProcessEntry>> {
        self.shared.processes.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<ProcessEntry>>> {
        self.shared.processes.subscribe()
    }

    /// Select a pid for history tracking; the history starts on the next poll.
    pub fn select(&self, pid: Option<u32>) {
        lock_or_recover(&self.shared.selection).pid = pid;
    }

    pub fn selected_pid(&self) -> Option<u32> {
        lock_or_recover(&self.shared.selection).pid
    }

    pub fn selected_process(&self) -> Option<ProcessEntry> {
        let pid = self.selected_pid()?;
        self.processes().iter().find(|e| e.pid == pid).cloned()
    }

    pub fn selected_history(&self) -> Vec<ProcessMetricSample> {
        self.shared.history.values()
    }

    pub fn terminate_selected(&self) -> bool {
        self.selected_pid()
            .is_some_and(|pid| self.shared.provider.terminate(pid))
    }

    pub fn force_terminate_selected(&self) -> bool {
        self.selected_pid()
            .is_some_and(|pid| self.shared.provider.force_terminate(pid))
    }

    pub fn provider(&self) -> &dyn ProcessProvider {
        self.shared.provider.as_ref()
    }
}

impl Drop for ProcessPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(shared: Arc<Shared>, mut shutdown_rx: oneshot::Receiver<()>) {
    loop {
        let poll_shared = shared.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || poll_shared.poll()).await {
            tracing::warn!(error = %e, operation = "poll_processes", "Process poll failed");
        }
        tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!("Process poller shutting down");
                break;
            }
            _ = tokio::time::sleep(shared.poll_interval) => {}
        }
    }
}
