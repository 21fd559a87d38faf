use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::{HistogramSummary, new_latency_histogram, summarize_histogram};

/// Concurrent storage for one measured request series.
///
/// Counters are relaxed atomics; the latency histogram sits behind a mutex.
/// Writers from any number of tasks may interleave freely; every observation
/// lands in exactly one counter increment and one histogram record.
#[derive(Debug)]
pub struct RequestSeries {
    requests: AtomicU64,
    failures: AtomicU64,
    bytes_total: AtomicU64,
    latency_us: Mutex<Histogram<u64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub requests: u64,
    pub failures: u64,
    pub bytes_total: u64,
    pub latency: HistogramSummary,
}

impl Default for RequestSeries {
    fn default() -> Self {
        Self {
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            bytes_total: AtomicU64::new(0),
            latency_us: Mutex::new(new_latency_histogram()),
        }
    }
}

impl RequestSeries {
    #[inline]
    pub fn observe(&self, elapsed_us: u64, bytes: u64, failed: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes_total.fetch_add(bytes, Ordering::Relaxed);

        let mut h = self.latency_us.lock();
        // Values above the histogram bound saturate instead of being dropped.
        let _ = h.saturating_record(elapsed_us.max(1));
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        let latency = summarize_histogram(&self.latency_us.lock());
        SeriesSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes_total: self.bytes_total.load(Ordering::Relaxed),
            latency,
        }
    }
}
