// Process enumeration with per-process CPU% from cpu-time deltas.
// Two strategies (full / restricted) chosen once from a capability check.

mod full;
mod poller;
mod restricted;
mod table;
mod tracker;

use std::path::Path;
use std::time::Duration;

use crate::models::ProcessEntry;

pub use full::FullProcessProvider;
pub use poller::{PollerSettings, ProcessPoller};
pub use restricted::RestrictedProcessProvider;
pub use table::{SysinfoProcessTable, parse_cgroup_app_id};
pub use tracker::CpuTimeTracker;

/// Listing and termination of OS processes.
pub trait ProcessProvider: Send + Sync {
    fn list_processes(&self) -> Vec<ProcessEntry>;

    /// Graceful termination (SIGTERM). `false` if the process is gone or the
    /// request was refused.
    fn terminate(&self, pid: u32) -> bool;

    /// Forceful termination (SIGKILL).
    fn force_terminate(&self, pid: u32) -> bool;

    fn access(&self) -> ProcessAccess;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSignal {
    Terminate,
    Kill,
}

/// One row of the OS process table before CPU% attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProcess {
    pub pid: u32,
    pub name: String,
    /// Cumulative user + system CPU time.
    pub cpu_time: Duration,
    pub memory_bytes: u64,
    pub uid: Option<u32>,
    pub user: String,
    pub is_running: bool,
    /// Desktop application id, when the process belongs to a launched app.
    pub app_id: Option<String>,
}

/// Kernel process table access.
pub trait ProcessTable: Send + Sync {
    fn scan(&self) -> Vec<RawProcess>;

    fn signal(&self, pid: u32, signal: TermSignal) -> bool;

    /// Uid of the current process's owner.
    fn current_uid(&self) -> Option<u32>;
}

/// Which process-listing capability the environment grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessAccess {
    Full,
    Restricted,
}

impl ProcessAccess {
    /// Restricted inside a Flatpak, a Snap, or a macOS app container.
    pub fn detect() -> Self {
        let home = std::env::var_os("HOME");
        Self::from_environment(
            std::env::var_os("FLATPAK_ID").is_some(),
            Path::new("/.flatpak-info").exists(),
            std::env::var_os("SNAP").is_some(),
            home.as_deref().map(Path::new),
        )
    }

    pub fn from_environment(
        flatpak_id: bool,
        flatpak_info: bool,
        snap: bool,
        home: Option<&Path>,
    ) -> Self {
        let containerized_home = home
            .and_then(Path::to_str)
            .is_some_and(|h| h.contains("/Library/Containers/"));
        if flatpak_id || flatpak_info || snap || containerized_home {
            ProcessAccess::Restricted
        } else {
            ProcessAccess::Full
        }
    }
}

/// Build the strategy for `access` over the live process table.
pub fn provider_for(access: ProcessAccess) -> Box<dyn ProcessProvider> {
    let table = SysinfoProcessTable::new();
    match access {
        ProcessAccess::Full => Box::new(FullProcessProvider::new(table)),
        ProcessAccess::Restricted => Box::new(RestrictedProcessProvider::new(table)),
    }
}

/// Reverse-DNS application ids double as icon names.
pub(crate) fn icon_for(app_id: Option<&str>) -> Option<String> {
    app_id.filter(|id| id.contains('.')).map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
    Name,
    Pid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Case-insensitive name match, or pid substring match. Empty query keeps all.
pub fn filter_processes(entries: &[ProcessEntry], query: &str) -> Vec<ProcessEntry> {
    if query.is_empty() {
        return entries.to_vec();
    }
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|e| e.name.to_lowercase().contains(&needle) || e.pid.to_string().contains(query))
        .cloned()
        .collect()
}

pub fn sort_processes(entries: &mut [ProcessEntry], key: SortKey, order: SortOrder) {
    entries.sort_by(|a, b| {
        let ord = match key {
            SortKey::Cpu => a.cpu_usage.total_cmp(&b.cpu_usage),
            SortKey::Memory => a.memory_bytes.cmp(&b.memory_bytes),
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Pid => a.pid.cmp(&b.pid),
        }
        .then_with(|| a.pid.cmp(&b.pid));
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
}
