use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

#[derive(Debug, Default)]
struct InnerMetrics {
    polls: AtomicU64,
    empty_polls: AtomicU64,
    rows_delivered: AtomicU64,
    boundary_queries: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
}

/// Counters shared by every scan in a process.
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls: u64,
    pub empty_polls: u64,
    pub rows_delivered: u64,
    pub boundary_queries: u64,
    pub retries: u64,
    pub failures: u64,
}

impl ScanMetrics {
    pub fn new() -> Self {
        ScanMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn record_poll(&self, rows: usize) {
        self.inner.polls.fetch_add(1, Ordering::Relaxed);
        if rows == 0 {
            self.inner.empty_polls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner
                .rows_delivered
                .fetch_add(rows as u64, Ordering::Relaxed);
        }
    }

    pub fn increment_boundary_queries(&self) {
        self.inner.boundary_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls: self.inner.polls.load(Ordering::Relaxed),
            empty_polls: self.inner.empty_polls.load(Ordering::Relaxed),
            rows_delivered: self.inner.rows_delivered.load(Ordering::Relaxed),
            boundary_queries: self.inner.boundary_queries.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "polls={} empty={} rows={} boundary_queries={} retries={} failures={}",
            self.polls,
            self.empty_polls,
            self.rows_delivered,
            self.boundary_queries,
            self.retries,
            self.failures
        )
    }
}
