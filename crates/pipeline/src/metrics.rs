use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for one pipeline run, shared by all stage executors.
#[derive(Debug, Default)]
pub struct RunMetrics {
    collaborator_calls: AtomicUsize,
    collaborator_failures: AtomicUsize,
    retries: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    cache_corrupt: AtomicUsize,
    cache_writes: AtomicUsize,
}

impl RunMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_call(&self, success: bool) {
        self.collaborator_calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.collaborator_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A corrupt entry is also a miss.
    pub fn record_cache_corrupt(&self) {
        self.cache_corrupt.fetch_add(1, Ordering::Relaxed);
        self.record_cache_miss();
    }

    pub fn record_cache_write(&self) {
        self.cache_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            collaborator_calls: self.collaborator_calls.load(Ordering::Relaxed),
            collaborator_failures: self.collaborator_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_corrupt: self.cache_corrupt.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Logical collaborator calls; retries are counted separately.
    pub collaborator_calls: usize,
    pub collaborator_failures: usize,
    pub retries: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_corrupt: usize,
    pub cache_writes: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}
