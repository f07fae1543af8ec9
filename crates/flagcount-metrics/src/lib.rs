//! flagcount-metrics: in-memory metric state for the exporter.
//!
//! Holds the current value of every exported metric, accepts writes as
//! atomic batches, and renders the Prometheus text exposition format.
//!
//! # Architecture
//!
//! ```text
//! MetricStore (RwLock<MetricSnapshot>)
//!   ├── apply(MetricBatch) ← one write lock per scrape cycle
//!   ├── reset_all()        ← zeroes gauges, keeps counters
//!   └── snapshot()         → consistent copy for readers
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod metric;
pub mod prometheus;
pub mod store;

pub use metric::{Counter, Gauge, GaugeFamily, Histogram, Labels};
pub use prometheus::{CONTENT_TYPE, render_prometheus};
pub use store::{HistogramSnapshot, MetricBatch, MetricSnapshot, MetricStore};
