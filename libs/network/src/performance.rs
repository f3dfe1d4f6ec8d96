//! Latency and Throughput Monitoring
//!
//! [`PerformanceMonitor`] turns per-message latency observations into
//! average/P95/P99 statistics for operators. Samples live in a bounded FIFO
//! store: once `capacity` samples are held, each new observation evicts the
//! oldest one.
//!
//! The sample store is guarded by a single lock that only the Performance
//! stage and stats readers take; encode/decode never touch it.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Minimum samples before P95 is computed from the distribution
const MIN_SAMPLES_P95: usize = 20;
/// Minimum samples before P99 is computed from the distribution
const MIN_SAMPLES_P99: usize = 100;
/// Throughput is recomputed at most this often
const THROUGHPUT_WINDOW: Duration = Duration::from_secs(1);

/// Point-in-time view of the monitor, all latencies in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencySnapshot {
    pub samples: usize,
    pub average_us: f64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub min_us: f64,
    pub max_us: f64,
    pub throughput_per_sec: f64,
    pub messages_total: u64,
}

#[derive(Debug)]
struct ThroughputWindow {
    started: Instant,
    messages_at_start: u64,
    rate: f64,
}

/// Thread-safe rolling latency store
#[derive(Debug)]
pub struct PerformanceMonitor {
    samples: Mutex<VecDeque<f64>>,
    capacity: usize,
    messages: AtomicU64,
    throughput: Mutex<ThroughputWindow>,
}

impl PerformanceMonitor {
    pub const DEFAULT_CAPACITY: usize = 100_000;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            messages: AtomicU64::new(0),
            throughput: Mutex::new(ThroughputWindow {
                started: Instant::now(),
                messages_at_start: 0,
                rate: 0.0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record one latency observation, evicting the oldest when full
    pub fn record_latency(&self, latency_us: f64) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(latency_us);
    }

    /// Count one processed message toward throughput
    #[inline]
    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn messages_total(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn average_latency(&self) -> f64 {
        average(self.samples.lock().iter())
    }

    /// P95, or the average while fewer than 20 samples exist
    pub fn p95_latency(&self) -> f64 {
        let sorted = self.sorted_samples();
        tail_percentile(&sorted, 0.95, MIN_SAMPLES_P95)
    }

    /// P99, or the average while fewer than 100 samples exist
    pub fn p99_latency(&self) -> f64 {
        let sorted = self.sorted_samples();
        tail_percentile(&sorted, 0.99, MIN_SAMPLES_P99)
    }

    /// Messages per second over the last completed one-second window
    pub fn throughput(&self) -> f64 {
        let total = self.messages.load(Ordering::Relaxed);
        let mut window = self.throughput.lock();
        let elapsed = window.started.elapsed();
        if elapsed >= THROUGHPUT_WINDOW {
            let delta = total.saturating_sub(window.messages_at_start);
            window.rate = delta as f64 / elapsed.as_secs_f64();
            window.started = Instant::now();
            window.messages_at_start = total;
        }
        window.rate
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let sorted = self.sorted_samples();
        let (min_us, max_us) = match (sorted.first(), sorted.last()) {
            (Some(&min), Some(&max)) => (min, max),
            _ => (0.0, 0.0),
        };
        LatencySnapshot {
            samples: sorted.len(),
            average_us: average(&sorted),
            p50_us: percentile(&sorted, 0.50),
            p95_us: tail_percentile(&sorted, 0.95, MIN_SAMPLES_P95),
            p99_us: tail_percentile(&sorted, 0.99, MIN_SAMPLES_P99),
            min_us,
            max_us,
            throughput_per_sec: self.throughput(),
            messages_total: self.messages_total(),
        }
    }

    /// Drop all samples and restart throughput accounting
    pub fn reset(&self) {
        self.samples.lock().clear();
        self.messages.store(0, Ordering::Relaxed);
        let mut window = self.throughput.lock();
        window.started = Instant::now();
        window.messages_at_start = 0;
        window.rate = 0.0;
    }

    // Copy out under the lock, sort outside it
    fn sorted_samples(&self) -> Vec<f64> {
        let mut sorted: Vec<f64> = self.samples.lock().iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

fn average<'a>(samples: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum, count) = samples
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * pct) as usize).min(sorted.len() - 1);
    sorted[index]
}

fn tail_percentile(sorted: &[f64], pct: f64, min_samples: usize) -> f64 {
    if sorted.len() < min_samples {
        average(sorted)
    } else {
        percentile(sorted, pct)
    }
}
