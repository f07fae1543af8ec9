//! Identities of the exported metrics.
//!
//! Every metric the exporter publishes is a variant here, so a write
//! cannot target a metric that is not registered for exposition.

/// Scalar gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gauge {
    ProductsTotal,
    LastScrapeTimestamp,
}

/// Monotonic counters. Never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Counter {
    ScrapeErrors,
}

/// Gauge families keyed by a label tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GaugeFamily {
    ConfigsTotal,
    EnvironmentsTotal,
    FeatureFlagsTotal,
    ZombieFlagsTotal,
}

/// Distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Histogram {
    ScrapeDuration,
}

const PRODUCT_LABELS: &[&str] = &["product_id", "product_name"];
const CONFIG_LABELS: &[&str] = &["product_id", "product_name", "config_id", "config_name"];

/// Prometheus client default buckets, in seconds.
const DEFAULT_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

impl Gauge {
    pub const ALL: [Gauge; 2] = [Gauge::ProductsTotal, Gauge::LastScrapeTimestamp];

    pub fn name(&self) -> &'static str {
        match self {
            Gauge::ProductsTotal => "products_total",
            Gauge::LastScrapeTimestamp => "last_scrape_timestamp",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Gauge::ProductsTotal => "Total number of products",
            Gauge::LastScrapeTimestamp => "Unix timestamp of the last completed scrape",
        }
    }
}

impl Counter {
    pub const ALL: [Counter; 1] = [Counter::ScrapeErrors];

    pub fn name(&self) -> &'static str {
        match self {
            Counter::ScrapeErrors => "scrape_errors_total",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Counter::ScrapeErrors => "Total number of API scrape errors",
        }
    }
}

impl GaugeFamily {
    pub const ALL: [GaugeFamily; 4] = [
        GaugeFamily::ConfigsTotal,
        GaugeFamily::EnvironmentsTotal,
        GaugeFamily::FeatureFlagsTotal,
        GaugeFamily::ZombieFlagsTotal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GaugeFamily::ConfigsTotal => "configs_total",
            GaugeFamily::EnvironmentsTotal => "environments_total",
            GaugeFamily::FeatureFlagsTotal => "feature_flags_total",
            GaugeFamily::ZombieFlagsTotal => "zombie_flags_total",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            GaugeFamily::ConfigsTotal => "Total number of configs per product",
            GaugeFamily::EnvironmentsTotal => "Total number of environments per product",
            GaugeFamily::FeatureFlagsTotal => "Total number of feature flags per config",
            GaugeFamily::ZombieFlagsTotal => "Total number of zombie flags per config",
        }
    }

    /// Label names, in the order [`Labels`] values are stored.
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            GaugeFamily::ConfigsTotal | GaugeFamily::EnvironmentsTotal => PRODUCT_LABELS,
            GaugeFamily::FeatureFlagsTotal | GaugeFamily::ZombieFlagsTotal => CONFIG_LABELS,
        }
    }
}

impl Histogram {
    pub const ALL: [Histogram; 1] = [Histogram::ScrapeDuration];

    pub fn name(&self) -> &'static str {
        match self {
            Histogram::ScrapeDuration => "scrape_duration_seconds",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Histogram::ScrapeDuration => "Duration of API scrapes in seconds",
        }
    }

    /// Upper bounds of the finite buckets; `+Inf` is implicit.
    pub fn buckets(&self) -> &'static [f64] {
        match self {
            Histogram::ScrapeDuration => DEFAULT_BUCKETS,
        }
    }
}

/// Label values of one series in a [`GaugeFamily`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Labels(Vec<String>);

impl Labels {
    /// Product-scoped labels: `product_id`, `product_name`.
    pub fn product(product_id: &str, product_name: &str) -> Self {
        Self(vec![product_id.to_string(), product_name.to_string()])
    }

    /// Config-scoped labels: product labels plus `config_id`, `config_name`.
    pub fn config(product_id: &str, product_name: &str, config_id: &str, config_name: &str) -> Self {
        Self(vec![
            product_id.to_string(),
            product_name.to_string(),
            config_id.to_string(),
            config_name.to_string(),
        ])
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Whether these values line up with `family`'s label names.
    pub fn fits(&self, family: GaugeFamily) -> bool {
        self.0.len() == family.label_names().len()
    }
}
