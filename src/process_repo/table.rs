// Live process table via sysinfo; app identity from the systemd scope in /proc/<pid>/cgroup.

use std::sync::Mutex;
use std::time::Duration;

use sysinfo::{
    Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, Signal, System, Uid,
    UpdateKind, Users,
};

use super::{ProcessTable, RawProcess, TermSignal};
use crate::monitors::lock_or_recover;

pub struct SysinfoProcessTable {
    sys: Mutex<System>,
    users: Users,
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_cpu()
        .with_memory()
        .with_user(UpdateKind::OnlyIfNotSet)
}

#[cfg(unix)]
fn uid_number(uid: &Uid) -> Option<u32> {
    Some(**uid)
}

#[cfg(not(unix))]
fn uid_number(_uid: &Uid) -> Option<u32> {
    None
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
            users: Users::new_with_refreshed_list(),
        }
    }

    fn user_name(&self, uid: Option<&Uid>) -> String {
        match uid {
            Some(uid) => self
                .users
                .get_user_by_id(uid)
                .map(|u| u.name().to_string())
                .or_else(|| uid_number(uid).map(|n| n.to_string()))
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    fn raw(&self, process: &Process) -> RawProcess {
        let pid = process.pid().as_u32();
        RawProcess {
            pid,
            name: process.name().to_string_lossy().into_owned(),
            cpu_time: Duration::from_millis(process.accumulated_cpu_time()),
            memory_bytes: process.memory(),
            uid: process.user_id().and_then(uid_number),
            user: self.user_name(process.user_id()),
            is_running: process.status() == ProcessStatus::Run,
            app_id: read_app_id(pid),
        }
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn scan(&self) -> Vec<RawProcess> {
        let mut sys = lock_or_recover(&self.sys);
        sys.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        sys.processes()
            .values()
            .filter(|p| p.pid().as_u32() > 0 && p.thread_kind().is_none())
            .map(|p| self.raw(p))
            .collect()
    }

    fn signal(&self, pid: u32, signal: TermSignal) -> bool {
        let pid = Pid::from_u32(pid);
        let mut sys = lock_or_recover(&self.sys);
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        let Some(process) = sys.process(pid) else {
            return false;
        };
        let delivered = match signal {
            TermSignal::Terminate => process.kill_with(Signal::Term).unwrap_or(false),
            TermSignal::Kill => process.kill(),
        };
        if !delivered {
            tracing::debug!(pid = pid.as_u32(), ?signal, operation = "signal_process", "Signal not delivered");
        }
        delivered
    }

    fn current_uid(&self) -> Option<u32> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut sys = lock_or_recover(&self.sys);
        sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), false, refresh_kind());
        sys.process(pid)?.user_id().and_then(uid_number)
    }
}

fn read_app_id(pid: u32) -> Option<String> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let content = std::fs::read_to_string(format!("/proc/{pid}/cgroup")).ok()?;
    parse_cgroup_app_id(&content)
}

/// Application id from a systemd app unit in a cgroup listing:
/// `app[-<launcher>]-<id>-<n>.scope` or `app[-<launcher>]-<id>[@<n>].service`.
/// Escaped dashes (`\x2d`) are restored.
pub fn parse_cgroup_app_id(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let path = line.rsplit(':').next()?;
        let unit = path.rsplit('/').next()?;
        let body = unit.strip_prefix("app-")?;
        let stem = if let Some(scope) = body.strip_suffix(".scope") {
            scope.rsplit_once('-').map(|(stem, _)| stem)?
        } else if let Some(service) = body.strip_suffix(".service") {
            service.split('@').next()?
        } else {
            return None;
        };
        let id = match stem.split_once('-') {
            Some((launcher, rest)) if !launcher.contains('.') && !rest.is_empty() => rest,
            _ => stem,
        };
        let id = id.replace("\\x2d", "-");
        (!id.is_empty()).then_some(id)
    })
}
