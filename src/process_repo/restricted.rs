// Caller-visible application processes only

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use tracing::instrument;

use super::full::attribute;
use super::{CpuTimeTracker, ProcessAccess, ProcessProvider, ProcessTable, TermSignal};
use crate::models::ProcessEntry;
use crate::monitors::lock_or_recover;

/// Lists the current user's processes that belong to a launched application,
/// and only terminates pids from that visible set.
pub struct RestrictedProcessProvider {
    table: Box<dyn ProcessTable>,
    tracker: Mutex<CpuTimeTracker>,
    visible: Mutex<HashSet<u32>>,
    uid: OnceLock<Option<u32>>,
}

impl RestrictedProcessProvider {
    pub fn new(table: impl ProcessTable + 'static) -> Self {
        Self {
            table: Box::new(table),
            tracker: Mutex::new(CpuTimeTracker::new()),
            visible: Mutex::new(HashSet::new()),
            uid: OnceLock::new(),
        }
    }

    fn owner_uid(&self) -> Option<u32> {
        *self.uid.get_or_init(|| self.table.current_uid())
    }

    fn signal_visible(&self, pid: u32, signal: TermSignal) -> bool {
        if !lock_or_recover(&self.visible).contains(&pid) {
            return false;
        }
        self.table.signal(pid, signal)
    }
}

impl ProcessProvider for RestrictedProcessProvider {
    #[instrument(level = "debug", skip(self), fields(provider = "restricted", operation = "list_processes"))]
    fn list_processes(&self) -> Vec<ProcessEntry> {
        let Some(uid) = self.owner_uid() else {
            return vec![];
        };
        let rows: Vec<_> = self
            .table
            .scan()
            .into_iter()
            .filter(|r| r.uid == Some(uid) && r.app_id.is_some())
            .collect();
        *lock_or_recover(&self.visible) = rows.iter().map(|r| r.pid).collect();
        attribute(&self.tracker, rows, Instant::now())
    }

    fn terminate(&self, pid: u32) -> bool {
        self.signal_visible(pid, TermSignal::Terminate)
    }

    fn force_terminate(&self, pid: u32) -> bool {
        self.signal_visible(pid, TermSignal::Kill)
    }

    fn access(&self) -> ProcessAccess {
        ProcessAccess::Restricted
    }
}
