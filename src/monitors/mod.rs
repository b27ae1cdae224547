// Per-metric monitors: turn raw counters into normalized snapshots.
// Each monitor owns its previous-counter state behind a mutex so a manual
// refresh and the periodic tick never interleave read-modify-write.

mod battery;
mod cpu;
mod disk;
mod gpu;
mod memory;
mod network;
mod thermal;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub use battery::BatteryMonitor;
pub use cpu::CpuMonitor;
pub use disk::DiskMonitor;
pub use gpu::GpuMonitor;
pub use memory::MemoryMonitor;
pub use network::NetworkMonitor;
pub use thermal::{FanRestoreGuard, TEMPERATURE_SENSORS, ThermalMonitor};

/// One metric domain: produces a fully computed snapshot per call.
pub trait Monitor: Send + Sync {
    type Snapshot;

    fn snapshot(&self) -> Self::Snapshot;
}

/// `current - previous`, or 0 when the counter went backwards (reset or wrap).
pub fn counter_delta(current: u64, previous: u64) -> u64 {
    current.checked_sub(previous).unwrap_or(0)
}

/// Bytes (or ticks) per second; 0 when no time has elapsed.
pub fn rate_per_second(delta: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        (delta as f64 / elapsed_secs).max(0.0)
    } else {
        0.0
    }
}

/// Clamp a derived percentage into [0, 100]; NaN maps to 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Lock a mutex, recovering the data from a poisoned lock. Every guarded
/// value in this crate is left consistent after any partial update.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Previous reading of a pair of cumulative byte counters.
#[derive(Default)]
pub(crate) struct RateTracker {
    previous: Mutex<Option<(u64, u64, Instant)>>,
}

impl RateTracker {
    /// Swap in the new counters and return the two per-second rates.
    /// The first call reports (0, 0).
    pub(crate) fn update(&self, first: u64, second: u64, now: Instant) -> (f64, f64) {
        let previous = lock_or_recover(&self.previous).replace((first, second, now));
        let Some((prev_first, prev_second, prev_at)) = previous else {
            return (0.0, 0.0);
        };
        let elapsed = now.saturating_duration_since(prev_at).as_secs_f64();
        (
            rate_per_second(counter_delta(first, prev_first), elapsed),
            rate_per_second(counter_delta(second, prev_second), elapsed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn regression_is_zero_delta() {
        assert_eq!(counter_delta(10, 20), 0);
        assert_eq!(counter_delta(20, 10), 10);
        assert_eq!(counter_delta(0, u64::MAX), 0);
    }

    #[test]
    fn rate_needs_elapsed_time() {
        assert_eq!(rate_per_second(100, 0.0), 0.0);
        assert_eq!(rate_per_second(100, -1.0), 0.0);
        assert_eq!(rate_per_second(100, 2.0), 50.0);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(clamp_percent(120.0), 100.0);
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }

    #[test]
    fn tracker_first_call_is_zero() {
        let tracker = RateTracker::default();
        let t0 = Instant::now();
        assert_eq!(tracker.update(1000, 500, t0), (0.0, 0.0));
        let (a, b) = tracker.update(3000, 400, t0 + Duration::from_secs(2));
        assert_eq!(a, 1000.0);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let mutex = std::sync::Arc::new(Mutex::new(7u32));
        let poisoner = mutex.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(mutex.is_poisoned());
        *lock_or_recover(&mutex) += 1;
        assert_eq!(*lock_or_recover(&mutex), 8);
    }
}
