// Condensed snapshot for out-of-process widgets, written to a shared key-value store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::SystemStats;

pub const SNAPSHOT_KEY: &str = "widget_snapshot";

/// Process-external key-value store readable by the widget process.
pub trait SharedStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()>;

    fn get(&self, key: &str) -> io::Result<Vec<u8>>;
}

/// One file per key under a directory. Writes go to a temp file first and
/// are renamed into place, so readers never see a partial snapshot.
pub struct FileSharedStore {
    dir: PathBuf,
}

impl FileSharedStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid store key {key:?}"),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SharedStore for FileSharedStore {
    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)
    }

    fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(key)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub cpu_usage: f64,
    pub memory_usage_percent: f64,
    pub memory_used: u64,
    pub memory_total: u64,
    pub network_in_per_sec: f64,
    pub network_out_per_sec: f64,
    pub disk_read_per_sec: f64,
    pub disk_write_per_sec: f64,
    pub cpu_history: Vec<f64>,
    pub memory_history: Vec<f64>,
    pub timestamp: u64,
}

impl WidgetSnapshot {
    pub fn empty() -> Self {
        Self {
            cpu_usage: 0.0,
            memory_usage_percent: 0.0,
            memory_used: 0,
            memory_total: 0,
            network_in_per_sec: 0.0,
            network_out_per_sec: 0.0,
            disk_read_per_sec: 0.0,
            disk_write_per_sec: 0.0,
            cpu_history: vec![],
            memory_history: vec![],
            timestamp: 0,
        }
    }

    /// Condense a tick; histories keep only their last `points` values.
    pub fn from_stats(
        stats: &SystemStats,
        cpu_history: &[f64],
        memory_history: &[f64],
        points: usize,
    ) -> Self {
        let tail = |h: &[f64]| h[h.len().saturating_sub(points)..].to_vec();
        Self {
            cpu_usage: stats.cpu.total_usage,
            memory_usage_percent: stats.memory.usage_percentage(),
            memory_used: stats.memory.used(),
            memory_total: stats.memory.total_physical,
            network_in_per_sec: stats.network.bytes_in_per_second,
            network_out_per_sec: stats.network.bytes_out_per_second,
            disk_read_per_sec: stats.disk.read_per_second,
            disk_write_per_sec: stats.disk.write_per_second,
            cpu_history: tail(cpu_history),
            memory_history: tail(memory_history),
            timestamp: stats.timestamp,
        }
    }
}

/// Best effort: failures are logged at debug and otherwise ignored.
pub fn publish(store: &dyn SharedStore, snapshot: &WidgetSnapshot) {
    let result = serde_json::to_vec(snapshot)
        .map_err(io::Error::other)
        .and_then(|bytes| store.put(SNAPSHOT_KEY, &bytes));
    if let Err(e) = result {
        tracing::debug!(error = %e, operation = "publish_widget", "widget snapshot not written");
    }
}

/// Consumer side: the last published snapshot, or `WidgetSnapshot::empty()`.
pub fn load_widget_snapshot(store: &dyn SharedStore) -> WidgetSnapshot {
    store
        .get(SNAPSHOT_KEY)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_else(WidgetSnapshot::empty)
}
