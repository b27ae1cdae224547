// Per-pid cpu-time delta tracking

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Previous cumulative CPU time per pid plus the wall-clock instant of that poll.
/// The map is replaced wholesale on every update, so exited pids drop out.
#[derive(Debug, Default)]
pub struct CpuTimeTracker {
    previous: HashMap<u32, Duration>,
    previous_at: Option<Instant>,
}

impl CpuTimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// CPU% per pid since the previous update: Δcpu / Δwall × 100. Not capped
    /// at 100 (multi-threaded processes). 0 on the first poll and for new pids.
    pub fn update(
        &mut self,
        samples: impl IntoIterator<Item = (u32, Duration)>,
        now: Instant,
    ) -> HashMap<u32, f64> {
        let elapsed = self
            .previous_at
            .map(|at| now.saturating_duration_since(at).as_secs_f64())
            .unwrap_or(0.0);

        let current: HashMap<u32, Duration> = samples.into_iter().collect();
        let usage = current
            .iter()
            .map(|(&pid, &cpu_time)| {
                let percent = match self.previous.get(&pid) {
                    Some(&prev) if elapsed > 0.0 => {
                        (cpu_time.saturating_sub(prev).as_secs_f64() / elapsed * 100.0).max(0.0)
                    }
                    _ => 0.0,
                };
                (pid, percent)
            })
            .collect();

        self.previous = current;
        self.previous_at = Some(now);
        usage
    }

    pub fn tracked(&self) -> usize {
        self.previous.len()
    }
}
