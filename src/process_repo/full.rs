// System-wide process listing

use std::sync::Mutex;
use std::time::Instant;

use tracing::instrument;

use super::{
    CpuTimeTracker, ProcessAccess, ProcessProvider, ProcessTable, RawProcess, TermSignal, icon_for,
};
use crate::models::ProcessEntry;
use crate::monitors::lock_or_recover;

pub struct FullProcessProvider {
    table: Box<dyn ProcessTable>,
    tracker: Mutex<CpuTimeTracker>,
}

impl FullProcessProvider {
    pub fn new(table: impl ProcessTable + 'static) -> Self {
        Self {
            table: Box::new(table),
            tracker: Mutex::new(CpuTimeTracker::new()),
        }
    }
}

/// Attribute CPU% to each row through the tracker and build entries.
pub(super) fn attribute(
    tracker: &Mutex<CpuTimeTracker>,
    rows: Vec<RawProcess>,
    now: Instant,
) -> Vec<ProcessEntry> {
    let usage = lock_or_recover(tracker).update(rows.iter().map(|r| (r.pid, r.cpu_time)), now);
    rows.into_iter()
        .map(|r| ProcessEntry {
            pid: r.pid,
            icon: icon_for(r.app_id.as_deref()),
            bundle_identifier: r.app_id,
            cpu_usage: usage.get(&r.pid).copied().unwrap_or(0.0),
            memory_bytes: r.memory_bytes,
            user: r.user,
            is_active: r.is_running,
            name: r.name,
        })
        .collect()
}

impl ProcessProvider for FullProcessProvider {
    #[instrument(level = "debug", skip(self), fields(provider = "full", operation = "list_processes"))]
    fn list_processes(&self) -> Vec<ProcessEntry> {
        let rows = self.table.scan();
        attribute(&self.tracker, rows, Instant::now())
    }

    fn terminate(&self, pid: u32) -> bool {
        self.table.signal(pid, TermSignal::Terminate)
    }

    fn force_terminate(&self, pid: u32) -> bool {
        self.table.signal(pid, TermSignal::Kill)
    }

    fn access(&self) -> ProcessAccess {
        ProcessAccess::Full
    }
}
