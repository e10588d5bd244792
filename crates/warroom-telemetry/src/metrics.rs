//! In-memory metrics: counters, gauges, histograms.
//!
//! Values live for the process lifetime and are read back through the
//! recorder's accessors. Writes take a read lock on the hot path and
//! upgrade to a write lock only when a key is seen for the first time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Monotonically increasing counter.
struct Counter {
    value: AtomicU64,
}

impl Counter {
    fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    fn increment(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Gauge that can move in both directions.
struct Gauge {
    // f64 bits stored in an i64 so updates stay atomic
    value: AtomicI64,
}

impl Gauge {
    fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }

    fn set(&self, v: f64) {
        self.value.store(v.to_bits() as i64, Ordering::Relaxed);
    }

    fn increment(&self, delta: f64) {
        loop {
            let current = self.value.load(Ordering::Relaxed);
            let current_f = f64::from_bits(current as u64);
            let new_f = current_f + delta;
            if self
                .value
                .compare_exchange_weak(
                    current,
                    new_f.to_bits() as i64,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                break;
            }
        }
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed) as u64)
    }
}

/// Histogram keeping every observation for percentile computation.
struct Histogram {
    observations: Mutex<Vec<f64>>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            observations: Mutex::new(Vec::new()),
        }
    }

    fn observe(&self, value: f64) {
        self.observations.lock().push(value);
    }

    fn summary(&self) -> HistogramSummary {
        let mut obs = self.observations.lock();
        if obs.is_empty() {
            return HistogramSummary::default();
        }
        obs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = obs.len();
        let sum: f64 = obs.iter().sum();
        let p50 = obs[count / 2];
        let p95 = obs[((count as f64 * 0.95) as usize).min(count - 1)];
        let p99 = obs[((count as f64 * 0.99) as usize).min(count - 1)];
        HistogramSummary {
            count: count as u64,
            sum,
            p50,
            p95,
            p99,
        }
    }
}

/// Summary statistics from a histogram.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Metric key: name plus sorted labels, so label order never splits a
/// series.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: impl Into<String>, labels: &[(&str, &str)]) -> Self {
        let mut sorted: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            name: name.into(),
            labels: sorted,
        }
    }
}

/// Thread-safe in-memory metrics recorder.
#[derive(Default)]
pub struct MetricsRecorder {
    counters: RwLock<HashMap<MetricKey, Counter>>,
    gauges: RwLock<HashMap<MetricKey, Gauge>>,
    histograms: RwLock<HashMap<MetricKey, Histogram>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by n.
    pub fn counter_inc(&self, name: &str, labels: &[(&str, &str)], n: u64) {
        let key = MetricKey::new(name, labels);
        let counters = self.counters.read();
        if let Some(c) = counters.get(&key) {
            c.increment(n);
            return;
        }
        drop(counters);
        let mut counters = self.counters.write();
        let c = counters.entry(key).or_insert_with(Counter::new);
        c.increment(n);
    }

    /// Set a gauge to a specific value.
    pub fn gauge_set(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = MetricKey::new(name, labels);
        let gauges = self.gauges.read();
        if let Some(g) = gauges.get(&key) {
            g.set(value);
            return;
        }
        drop(gauges);
        let mut gauges = self.gauges.write();
        let g = gauges.entry(key).or_insert_with(Gauge::new);
        g.set(value);
    }

    /// Increment or decrement a gauge by delta.
    pub fn gauge_inc(&self, name: &str, labels: &[(&str, &str)], delta: f64) {
        let key = MetricKey::new(name, labels);
        let gauges = self.gauges.read();
        if let Some(g) = gauges.get(&key) {
            g.increment(delta);
            return;
        }
        drop(gauges);
        let mut gauges = self.gauges.write();
        let g = gauges.entry(key).or_insert_with(Gauge::new);
        g.increment(delta);
    }

    /// Record a histogram observation.
    pub fn histogram_observe(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = MetricKey::new(name, labels);
        let histograms = self.histograms.read();
        if let Some(h) = histograms.get(&key) {
            h.observe(value);
            return;
        }
        drop(histograms);
        let mut histograms = self.histograms.write();
        let h = histograms.entry(key).or_insert_with(Histogram::new);
        h.observe(value);
    }

    /// Current counter value; zero if the counter was never touched.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = MetricKey::new(name, labels);
        self.counters.read().get(&key).map(Counter::get).unwrap_or(0)
    }

    /// Current gauge value, if the gauge exists.
    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let key = MetricKey::new(name, labels);
        self.gauges.read().get(&key).map(Gauge::get)
    }

    /// Percentile summary for a histogram, if it exists.
    pub fn histogram_summary(&self, name: &str, labels: &[(&str, &str)]) -> Option<HistogramSummary> {
        let key = MetricKey::new(name, labels);
        self.histograms.read().get(&key).map(Histogram::summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counters_accumulate() {
        let recorder = MetricsRecorder::new();
        recorder.counter_inc("runs.started", &[], 1);
        recorder.counter_inc("runs.started", &[], 2);
        assert_eq!(recorder.counter_value("runs.started", &[]), 3);
        assert_eq!(recorder.counter_value("runs.completed", &[]), 0);
    }

    #[test]
    fn gauges_set_and_move() {
        let recorder = MetricsRecorder::new();
        recorder.gauge_set("runs.active", &[], 2.0);
        recorder.gauge_inc("runs.active", &[], 1.0);
        recorder.gauge_inc("runs.active", &[], -3.0);
        assert_eq!(recorder.gauge_value("runs.active", &[]), Some(0.0));
        assert_eq!(recorder.gauge_value("absent", &[]), None);
    }

    #[test]
    fn histogram_summary_has_percentiles() {
        let recorder = MetricsRecorder::new();
        for i in 1..=100 {
            recorder.histogram_observe("phase.duration_ms", &[("phase", "opening")], i as f64);
        }
        let summary = recorder
            .histogram_summary("phase.duration_ms", &[("phase", "opening")])
            .unwrap();
        assert_eq!(summary.count, 100);
        assert!((summary.sum - 5050.0).abs() < 1e-9);
        assert!(summary.p50 >= 50.0 && summary.p50 <= 52.0);
        assert!(summary.p95 >= 95.0);
        assert!(summary.p99 <= 100.0);
    }

    #[test]
    fn label_order_never_splits_a_series() {
        let recorder = MetricsRecorder::new();
        recorder.counter_inc("calls", &[("agent", "cardiology"), ("outcome", "ok")], 1);
        recorder.counter_inc("calls", &[("outcome", "ok"), ("agent", "cardiology")], 1);
        assert_eq!(
            recorder.counter_value("calls", &[("agent", "cardiology"), ("outcome", "ok")]),
            2
        );
    }

    #[test]
    fn concurrent_counter_increments() {
        let recorder = Arc::new(MetricsRecorder::new());
        let mut handles = Vec::new();
        for _ in 0..10 {
            let recorder = recorder.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    recorder.counter_inc("contended", &[], 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(recorder.counter_value("contended", &[]), 10_000);
    }
}
