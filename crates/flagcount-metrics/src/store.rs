//! Metric store: current values of every exported metric.
//!
//! Writers stage updates in a [`MetricBatch`] and commit it with
//! [`MetricStore::apply`], which takes the write lock once. Readers take
//! the read lock long enough to copy a [`MetricSnapshot`], so they always
//! observe whole batches.

use std::collections::BTreeMap;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::metric::{Counter, Gauge, GaugeFamily, Histogram, Labels};
use crate::prometheus::render_prometheus;

/// Default metric name prefix.
pub const DEFAULT_NAMESPACE: &str = "flagcount";

/// Observed distribution of a [`Histogram`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// Upper bounds of the finite buckets.
    pub bounds: &'static [f64],
    /// Per-bucket (non-cumulative) observation counts, one per bound.
    pub bucket_counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramSnapshot {
    fn new(histogram: Histogram) -> Self {
        let bounds = histogram.buckets();
        Self {
            bounds,
            bucket_counts: vec![0; bounds.len()],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, value: f64) {
        if let Some(idx) = self.bounds.iter().position(|bound| value <= *bound) {
            self.bucket_counts[idx] += 1;
        }
        self.sum += value;
        self.count += 1;
    }

    /// Cumulative counts per finite bound, as exposed in `_bucket` series.
    pub fn cumulative(&self) -> Vec<u64> {
        self.bucket_counts
            .iter()
            .scan(0u64, |acc, n| {
                *acc += n;
                Some(*acc)
            })
            .collect()
    }
}

/// Point-in-time copy of every metric value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub namespace: String,
    pub gauges: BTreeMap<Gauge, f64>,
    pub counters: BTreeMap<Counter, u64>,
    pub families: BTreeMap<GaugeFamily, BTreeMap<Labels, f64>>,
    pub histograms: BTreeMap<Histogram, HistogramSnapshot>,
}

impl MetricSnapshot {
    fn empty(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            gauges: Gauge::ALL.iter().map(|g| (*g, 0.0)).collect(),
            counters: Counter::ALL.iter().map(|c| (*c, 0)).collect(),
            families: GaugeFamily::ALL
                .iter()
                .map(|f| (*f, BTreeMap::new()))
                .collect(),
            histograms: Histogram::ALL
                .iter()
                .map(|h| (*h, HistogramSnapshot::new(*h)))
                .collect(),
        }
    }

    pub fn scalar(&self, gauge: Gauge) -> f64 {
        self.gauges.get(&gauge).copied().unwrap_or_default()
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.counters.get(&counter).copied().unwrap_or_default()
    }

    /// Value of one labeled series, if it has been set.
    pub fn labeled(&self, family: GaugeFamily, labels: &Labels) -> Option<f64> {
        self.families.get(&family)?.get(labels).copied()
    }

    /// Number of series currently present in `family`.
    pub fn series_count(&self, family: GaugeFamily) -> usize {
        self.families.get(&family).map_or(0, BTreeMap::len)
    }

    pub fn histogram(&self, histogram: Histogram) -> Option<&HistogramSnapshot> {
        self.histograms.get(&histogram)
    }

    fn apply_op(&mut self, op: MetricOp) {
        match op {
            MetricOp::SetScalar(gauge, value) => {
                self.gauges.insert(gauge, value);
            }
            MetricOp::Increment(counter, by) => {
                *self.counters.entry(counter).or_default() += by;
            }
            MetricOp::SetLabeled(family, labels, value) => {
                if !labels.fits(family) {
                    warn!(
                        metric = family.name(),
                        labels = labels.values().len(),
                        expected = family.label_names().len(),
                        "dropping write with mismatched label count"
                    );
                    return;
                }
                self.families.entry(family).or_default().insert(labels, value);
            }
            MetricOp::Observe(histogram, value) => {
                self.histograms
                    .entry(histogram)
                    .or_insert_with(|| HistogramSnapshot::new(histogram))
                    .observe(value);
            }
        }
    }

    fn reset(&mut self) {
        for value in self.gauges.values_mut() {
            *value = 0.0;
        }
        for series in self.families.values_mut() {
            series.clear();
        }
    }
}

/// A single staged write.
#[derive(Debug, Clone, PartialEq)]
enum MetricOp {
    SetScalar(Gauge, f64),
    Increment(Counter, u64),
    SetLabeled(GaugeFamily, Labels, f64),
    Observe(Histogram, f64),
}

/// Writes staged for one atomic commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricBatch {
    ops: Vec<MetricOp>,
}

impl MetricBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scalar(&mut self, gauge: Gauge, value: f64) -> &mut Self {
        self.ops.push(MetricOp::SetScalar(gauge, value));
        self
    }

    pub fn increment_counter(&mut self, counter: Counter) -> &mut Self {
        self.ops.push(MetricOp::Increment(counter, 1));
        self
    }

    pub fn set_labeled(&mut self, family: GaugeFamily, labels: Labels, value: f64) -> &mut Self {
        self.ops.push(MetricOp::SetLabeled(family, labels, value));
        self
    }

    pub fn observe(&mut self, histogram: Histogram, value: f64) -> &mut Self {
        self.ops.push(MetricOp::Observe(histogram, value));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Holds current metric values behind a read-write lock.
///
/// Constructed explicitly and shared by `Arc`; there is no global
/// registry, so tests can build isolated stores.
pub struct MetricStore {
    state: RwLock<MetricSnapshot>,
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricStore {
    /// Create a store with the default `flagcount` namespace.
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    /// Create a store whose metric names are prefixed with `namespace`.
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            state: RwLock::new(MetricSnapshot::empty(namespace)),
        }
    }

    /// Commit every write in `batch` under one write lock.
    pub async fn apply(&self, batch: MetricBatch) {
        if batch.is_empty() {
            return;
        }
        let ops = batch.len();
        let mut state = self.state.write().await;
        for op in batch.ops {
            state.apply_op(op);
        }
        debug!(ops, "metric batch committed");
    }

    pub async fn set_scalar(&self, gauge: Gauge, value: f64) {
        let mut batch = MetricBatch::new();
        batch.set_scalar(gauge, value);
        self.apply(batch).await;
    }

    pub async fn increment_counter(&self, counter: Counter) {
        let mut batch = MetricBatch::new();
        batch.increment_counter(counter);
        self.apply(batch).await;
    }

    pub async fn set_labeled(&self, family: GaugeFamily, labels: Labels, value: f64) {
        let mut batch = MetricBatch::new();
        batch.set_labeled(family, labels, value);
        self.apply(batch).await;
    }

    pub async fn observe(&self, histogram: Histogram, value: f64) {
        let mut batch = MetricBatch::new();
        batch.observe(histogram, value);
        self.apply(batch).await;
    }

    /// Zero every scalar gauge and drop every labeled series.
    ///
    /// Counters and histograms keep their values: they are monotonic for
    /// the life of the process.
    pub async fn reset_all(&self) {
        self.state.write().await.reset();
        debug!("metric store reset");
    }

    /// Consistent copy of the current values.
    pub async fn snapshot(&self) -> MetricSnapshot {
        self.state.read().await.clone()
    }

    pub async fn scalar(&self, gauge: Gauge) -> f64 {
        self.state.read().await.scalar(gauge)
    }

    pub async fn counter(&self, counter: Counter) -> u64 {
        self.state.read().await.counter(counter)
    }

    pub async fn labeled(&self, family: GaugeFamily, labels: &Labels) -> Option<f64> {
        self.state.read().await.labeled(family, labels)
    }

    /// Number of observations recorded into `histogram`.
    pub async fn histogram_count(&self, histogram: Histogram) -> u64 {
        self.state
            .read()
            .await
            .histogram(histogram)
            .map_or(0, |h| h.count)
    }

    /// Sum of the observations recorded into `histogram`.
    pub async fn histogram_sum(&self, histogram: Histogram) -> f64 {
        self.state
            .read()
            .await
            .histogram(histogram)
            .map_or(0.0, |h| h.sum)
    }

    /// Render the current values in Prometheus text format.
    pub async fn render(&self) -> String {
        let snapshot = self.snapshot().await;
        render_prometheus(&snapshot)
    }
}
