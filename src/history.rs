// Bounded chronological history per metric (oldest evicted first)

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::monitors::lock_or_recover;

pub const DEFAULT_HISTORY_CAPACITY: usize = 600;

struct Inner<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> Inner<T> {
    fn trim(&mut self) {
        let excess = self.values.len().saturating_sub(self.capacity);
        self.values.drain(..excess);
    }
}

/// Fixed-capacity ring buffer shared between the sampling task and readers.
/// Every operation takes the lock, so readers never see a torn sequence.
pub struct HistoryBuffer<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                values: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
                capacity,
            }),
        }
    }

    /// Append, then evict exactly as many of the oldest entries as needed.
    pub fn append(&self, value: T) {
        let mut inner = lock_or_recover(&self.inner);
        inner.values.push_back(value);
        inner.trim();
    }

    /// Copy of the buffer, oldest first.
    pub fn values(&self) -> Vec<T> {
        lock_or_recover(&self.inner).values.iter().cloned().collect()
    }

    /// The `n` most recent entries, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<T> {
        let inner = lock_or_recover(&self.inner);
        let skip = inner.values.len().saturating_sub(n);
        inner.values.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<T> {
        lock_or_recover(&self.inner).values.back().cloned()
    }

    pub fn clear(&self) {
        lock_or_recover(&self.inner).values.clear();
    }

    /// Shrinking trims the oldest entries immediately; growing only raises the ceiling.
    pub fn resize(&self, capacity: usize) {
        let mut inner = lock_or_recover(&self.inner);
        inner.capacity = capacity;
        inner.trim();
    }

    pub fn capacity(&self) -> usize {
        lock_or_recover(&self.inner).capacity
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.inner).values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
