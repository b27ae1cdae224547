// Shared test fakes: scripted counter sources, SMC register file, process table, store
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vitals::counters::{
    CounterSource, CpuTickSample, CpuTicks, DiskCounters, MemoryCounters, NetworkCounters,
    PowerReading, RawGpuDevice,
};
use vitals::error::{ReadError, SmcError};
use vitals::monitors::{
    BatteryMonitor, CpuMonitor, DiskMonitor, GpuMonitor, MemoryMonitor, NetworkMonitor,
    ThermalMonitor,
};
use vitals::process_repo::{ProcessTable, RawProcess, TermSignal};
use vitals::smc::codec::{FPE2, SP78, UI8};
use vitals::smc::{FourCc, SmcConnection, SmcValue};
use vitals::widget::SharedStore;
use vitals::worker::Monitors;

/// Returns the scripted readings in order; `None` entries (and an exhausted
/// script) read as an error.
pub struct Scripted<T> {
    readings: Mutex<VecDeque<Option<T>>>,
}

impl<T> Scripted<T> {
    pub fn new(readings: Vec<Option<T>>) -> Self {
        Self {
            readings: Mutex::new(readings.into()),
        }
    }
}

impl<T: Send> CounterSource for Scripted<T> {
    type Output = T;

    fn read(&self) -> Result<T, ReadError> {
        self.readings
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or(ReadError::Unsupported("scripted reading"))
    }
}

/// Always returns the same reading.
pub struct Fixed<T>(pub T);

impl<T: Clone + Send + Sync> CounterSource for Fixed<T> {
    type Output = T;

    fn read(&self) -> Result<T, ReadError> {
        Ok(self.0.clone())
    }
}

pub fn ticks(user: u64, system: u64, idle: u64, nice: u64) -> CpuTicks {
    CpuTicks {
        user,
        system,
        idle,
        nice,
    }
}

pub fn cpu_sample(total: CpuTicks, cores: Vec<CpuTicks>) -> CpuTickSample {
    CpuTickSample { total, cores }
}

pub fn memory_counters() -> MemoryCounters {
    MemoryCounters {
        free: 4_000,
        active: 3_000,
        inactive: 1_000,
        wired: 1_500,
        compressed: 500,
        total_physical: 10_000,
    }
}

/// Monitors over constant counters and no hardware channel.
pub fn quiet_monitors() -> Monitors {
    Monitors {
        cpu: CpuMonitor::new(Fixed(cpu_sample(ticks(100, 50, 850, 0), vec![]))),
        memory: MemoryMonitor::new(Fixed(memory_counters())),
        gpu: GpuMonitor::new(Fixed(Vec::<RawGpuDevice>::new())),
        network: NetworkMonitor::new(Fixed(NetworkCounters::default())),
        disk: DiskMonitor::new(Fixed(DiskCounters::default())),
        battery: BatteryMonitor::new(Fixed(PowerReading::default())),
        thermal: Arc::new(ThermalMonitor::new(None)),
    }
}

/// In-memory SMC register file that records every write.
#[derive(Default)]
pub struct FakeSmc {
    keys: Mutex<HashMap<FourCc, SmcValue>>,
    writes: Mutex<Vec<(FourCc, FourCc, Vec<u8>)>>,
    reads: AtomicUsize,
    deny_writes: bool,
}

fn key(code: &str) -> FourCc {
    code.parse().unwrap()
}

impl FakeSmc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write fails, as for an unprivileged caller.
    pub fn read_only() -> Self {
        Self {
            deny_writes: true,
            ..Self::default()
        }
    }

    pub fn set(&self, code: &str, data_type: FourCc, bytes: &[u8]) {
        self.keys.lock().unwrap().insert(
            key(code),
            SmcValue {
                data_type,
                data_size: bytes.len() as u32,
                bytes: bytes.to_vec(),
            },
        );
    }

    pub fn set_fpe2(&self, code: &str, value: f64) {
        self.set(code, FPE2, &(((value * 4.0) as u16).to_be_bytes()));
    }

    pub fn set_sp78(&self, code: &str, celsius: f64) {
        self.set(code, SP78, &(((celsius * 256.0) as i16).to_be_bytes()));
    }

    pub fn set_u8(&self, code: &str, value: u8) {
        self.set(code, UI8, &[value]);
    }

    pub fn remove(&self, code: &str) {
        self.keys.lock().unwrap().remove(&key(code));
    }

    /// One fan: count, current, min, max, target (fpe2) and mode (ui8).
    pub fn with_fan(self, current: f64, min: f64, max: f64) -> Self {
        self.set_u8("FNum", 1);
        self.set_fpe2("F0Ac", current);
        self.set_fpe2("F0Mn", min);
        self.set_fpe2("F0Mx", max);
        self.set_fpe2("F0Tg", current);
        self.set_u8("F0Md", 0);
        self
    }

    pub fn writes(&self) -> Vec<(String, FourCc, Vec<u8>)> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(k, t, b)| (k.to_string(), *t, b.clone()))
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SmcConnection for FakeSmc {
    fn read_key(&self, key: FourCc) -> Result<SmcValue, SmcError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.keys
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| SmcError::KeyNotFound(key.to_string()))
    }

    fn write_key(&self, key: FourCc, data_type: FourCc, bytes: &[u8]) -> Result<(), SmcError> {
        if self.deny_writes {
            return Err(SmcError::Rejected {
                key: key.to_string(),
                code: 0x86,
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((key, data_type, bytes.to_vec()));
        let mut keys = self.keys.lock().unwrap();
        if let Some(value) = keys.get_mut(&key) {
            value.bytes = bytes.to_vec();
        }
        Ok(())
    }
}

/// Process table whose rows the test can change between polls.
#[derive(Clone, Default)]
pub struct FakeProcessTable {
    pub rows: Arc<Mutex<Vec<RawProcess>>>,
    pub signals: Arc<Mutex<Vec<(u32, TermSignal)>>>,
    pub uid: Option<u32>,
}

impl FakeProcessTable {
    pub fn new(rows: Vec<RawProcess>, uid: Option<u32>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            signals: Arc::new(Mutex::new(vec![])),
            uid,
        }
    }

    pub fn set_rows(&self, rows: Vec<RawProcess>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn signals(&self) -> Vec<(u32, TermSignal)> {
        self.signals.lock().unwrap().clone()
    }
}

impl ProcessTable for FakeProcessTable {
    fn scan(&self) -> Vec<RawProcess> {
        self.rows.lock().unwrap().clone()
    }

    fn signal(&self, pid: u32, signal: TermSignal) -> bool {
        let exists = self.rows.lock().unwrap().iter().any(|r| r.pid == pid);
        if exists {
            self.signals.lock().unwrap().push((pid, signal));
        }
        exists
    }

    fn current_uid(&self) -> Option<u32> {
        self.uid
    }
}

pub fn raw_process(
    pid: u32,
    name: &str,
    cpu_time_ms: u64,
    uid: u32,
    app_id: Option<&str>,
) -> RawProcess {
    RawProcess {
        pid,
        name: name.to_string(),
        cpu_time: Duration::from_millis(cpu_time_ms),
        memory_bytes: u64::from(pid) * 1024,
        uid: Some(uid),
        user: format!("user{uid}"),
        is_running: true,
        app_id: app_id.map(str::to_string),
    }
}

/// Shared store kept in memory; counts successful puts.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl SharedStore for MemoryStore {
    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

/// Store whose writes always fail.
pub struct BrokenStore;

impl SharedStore for BrokenStore {
    fn put(&self, _key: &str, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }

    fn get(&self, _key: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::from(io::ErrorKind::NotFound))
    }
}
