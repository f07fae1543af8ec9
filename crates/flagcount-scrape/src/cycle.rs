//! Scrape cycle: one pass over the remote API into the metric store.
//!
//! Resources are fetched strictly in sequence. Every write of a cycle is
//! staged in one [`MetricBatch`] and committed at the end, so the
//! exposition endpoint sees either the previous cycle or this one.
//!
//! Failure policy:
//! - configs, environments or stale-flag report fails → the cycle aborts,
//!   only the error counter and duration are committed;
//! - one config's feature flags fail → that config is skipped, the error
//!   counter is incremented, the cycle continues.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use flagcount_client::{FetchError, FlagApi};
use flagcount_core::{ConfigId, ScrapeTarget};
use flagcount_metrics::{Counter, Gauge, GaugeFamily, Histogram, Labels, MetricBatch, MetricStore};

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every fetch succeeded.
    Success,
    /// Feature flags could not be fetched for these configs.
    PartialSuccess { failed_configs: Vec<ConfigId> },
    /// The configs fetch failed; nothing but the error was recorded.
    AbortedConfigs,
    /// The environments fetch failed.
    AbortedEnvironments,
    /// The stale-flag report fetch failed.
    AbortedStaleFlags,
    /// Another cycle held the lock; this one did not run.
    Skipped,
}

impl CycleOutcome {
    /// Whether the cycle committed gauge values.
    pub fn is_committed(&self) -> bool {
        matches!(self, CycleOutcome::Success | CycleOutcome::PartialSuccess { .. })
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Scrape errors added to the counter by this cycle.
    pub errors: u64,
    pub configs: usize,
    pub environments: usize,
    pub stale_flags: usize,
    pub duration: Duration,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            outcome: CycleOutcome::Skipped,
            errors: 0,
            configs: 0,
            environments: 0,
            stale_flags: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Which cycle-aborting fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Configs,
    Environments,
    StaleFlags,
}

impl Step {
    fn as_str(&self) -> &'static str {
        match self {
            Step::Configs => "configs",
            Step::Environments => "environments",
            Step::StaleFlags => "stale flags",
        }
    }

    fn outcome(&self) -> CycleOutcome {
        match self {
            Step::Configs => CycleOutcome::AbortedConfigs,
            Step::Environments => CycleOutcome::AbortedEnvironments,
            Step::StaleFlags => CycleOutcome::AbortedStaleFlags,
        }
    }
}

/// Everything a non-aborted cycle staged.
struct Collected {
    batch: MetricBatch,
    failed_configs: Vec<ConfigId>,
    configs: usize,
    environments: usize,
    stale_flags: usize,
}

/// Runs scrape cycles for one [`ScrapeTarget`].
pub struct Scraper<A> {
    api: A,
    store: Arc<MetricStore>,
    target: ScrapeTarget,
    /// Held for the whole cycle; at most one cycle runs at a time.
    cycle_lock: Mutex<()>,
}

impl<A: FlagApi> Scraper<A> {
    pub fn new(api: A, store: Arc<MetricStore>, target: ScrapeTarget) -> Self {
        Self {
            api,
            store,
            target,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &Arc<MetricStore> {
        &self.store
    }

    /// Run one scrape cycle.
    ///
    /// Returns [`CycleOutcome::Skipped`] without touching the store when
    /// another cycle is in progress. Fetch errors never escape; they are
    /// logged and counted in `scrape_errors_total`.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            debug!("scrape already in progress, skipping");
            return CycleReport::skipped();
        };

        let started = Instant::now();
        info!(product_id = %self.target.product_id(), "starting metrics scrape");

        let (mut batch, report) = match self.collect(cancel).await {
            Ok(collected) => {
                let outcome = if collected.failed_configs.is_empty() {
                    CycleOutcome::Success
                } else {
                    CycleOutcome::PartialSuccess {
                        failed_configs: collected.failed_configs.clone(),
                    }
                };
                let report = CycleReport {
                    outcome,
                    errors: collected.failed_configs.len() as u64,
                    configs: collected.configs,
                    environments: collected.environments,
                    stale_flags: collected.stale_flags,
                    duration: Duration::ZERO,
                };
                (collected.batch, report)
            }
            Err((step, err)) => {
                error!(step = step.as_str(), error = %err, "scrape aborted");
                // Staged gauges are discarded; only the failure is recorded.
                let mut batch = MetricBatch::new();
                batch.increment_counter(Counter::ScrapeErrors);
                let report = CycleReport {
                    outcome: step.outcome(),
                    errors: 1,
                    ..CycleReport::skipped()
                };
                (batch, report)
            }
        };

        let duration = started.elapsed();
        batch.observe(Histogram::ScrapeDuration, duration.as_secs_f64());
        self.store.apply(batch).await;

        if report.outcome.is_committed() {
            info!(
                configs_count = report.configs,
                environments_count = report.environments,
                zombieflags_count = report.stale_flags,
                errors = report.errors,
                duration_ms = duration.as_millis() as u64,
                "metrics scrape completed"
            );
        }

        CycleReport { duration, ..report }
    }

    /// Fetch every resource and stage the resulting writes.
    async fn collect(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Collected, (Step, FetchError)> {
        let product_id = self.target.product_id();
        let product_name = self.target.product_name();
        let mut batch = MetricBatch::new();

        // Single-product deployment.
        batch.set_scalar(Gauge::ProductsTotal, 1.0);

        let configs = self
            .api
            .fetch_configs(cancel, product_id)
            .await
            .map_err(|e| (Step::Configs, e))?;
        let environments = self
            .api
            .fetch_environments(cancel, product_id)
            .await
            .map_err(|e| (Step::Environments, e))?;
        let stale = self
            .api
            .fetch_stale_flags(cancel, product_id)
            .await
            .map_err(|e| (Step::StaleFlags, e))?;

        let product_labels = Labels::product(product_id, product_name);
        batch
            .set_labeled(GaugeFamily::ConfigsTotal, product_labels.clone(), configs.len() as f64)
            .set_labeled(GaugeFamily::EnvironmentsTotal, product_labels, environments.len() as f64);

        // Each group reports its own stale count.
        for group in &stale.configs {
            batch.set_labeled(
                GaugeFamily::ZombieFlagsTotal,
                Labels::config(product_id, product_name, &group.config_id, &group.name),
                group.stale_count() as f64,
            );
        }

        let mut failed_configs = Vec::new();
        for config in &configs {
            match self.api.fetch_feature_flags(cancel, &config.config_id).await {
                Ok(flags) => {
                    batch.set_labeled(
                        GaugeFamily::FeatureFlagsTotal,
                        Labels::config(product_id, product_name, &config.config_id, &config.name),
                        flags.len() as f64,
                    );
                    debug!(
                        config_id = %config.config_id,
                        config_name = %config.name,
                        feature_flags_count = flags.len(),
                        "collected feature flags"
                    );
                }
                Err(e) => {
                    error!(
                        config_id = %config.config_id,
                        config_name = %config.name,
                        error = %e,
                        "failed to get feature flags for config"
                    );
                    batch.increment_counter(Counter::ScrapeErrors);
                    failed_configs.push(config.config_id.clone());
                }
            }
        }

        batch.set_scalar(Gauge::LastScrapeTimestamp, epoch_secs_f64());

        Ok(Collected {
            batch,
            failed_configs,
            configs: configs.len(),
            environments: environments.len(),
            stale_flags: stale.total_stale(),
        })
    }
}

fn epoch_secs_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeApi;

    fn scraper(api: FakeApi) -> Scraper<FakeApi> {
        Scraper::new(
            api,
            Arc::new(MetricStore::new()),
            ScrapeTarget::new("org-1", "p1", "http://unused", "secret"),
        )
    }

    fn product() -> Labels {
        Labels::product("p1", "product-p1")
    }

    fn config(id: &str, name: &str) -> Labels {
        Labels::config("p1", "product-p1", id, name)
    }

    #[tokio::test]
    async fn full_success_publishes_every_gauge() {
        let scraper = scraper(FakeApi::fixture());
        let before = epoch_secs_f64();

        let report = scraper.run_cycle(&CancellationToken::new()).await;
        let after = epoch_secs_f64();

        assert_eq!(report.outcome, CycleOutcome::Success);
        assert_eq!(report.errors, 0);

        let snap = scraper.store().snapshot().await;
        assert_eq!(snap.scalar(Gauge::ProductsTotal), 1.0);
        assert_eq!(snap.labeled(GaugeFamily::ConfigsTotal, &product()), Some(1.0));
        assert_eq!(snap.labeled(GaugeFamily::EnvironmentsTotal, &product()), Some(1.0));
        assert_eq!(
            snap.labeled(GaugeFamily::FeatureFlagsTotal, &config("c1", "Config1")),
            Some(3.0)
        );
        assert_eq!(
            snap.labeled(GaugeFamily::ZombieFlagsTotal, &config("c1", "Config1")),
            Some(2.0)
        );
        let ts = snap.scalar(Gauge::LastScrapeTimestamp);
        assert!(ts >= before && ts <= after, "timestamp {ts} outside [{before}, {after}]");
        assert_eq!(snap.counter(Counter::ScrapeErrors), 0);
        assert_eq!(snap.histogram(Histogram::ScrapeDuration).unwrap().count, 1);
    }

    #[tokio::test]
    async fn configs_failure_aborts_without_gauges() {
        let api = FakeApi::fixture();
        api.fail_configs(true);
        let scraper = scraper(api);

        let report = scraper.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.outcome, CycleOutcome::AbortedConfigs);
        assert_eq!(report.errors, 1);

        let snap = scraper.store().snapshot().await;
        assert_eq!(snap.counter(Counter::ScrapeErrors), 1);
        assert_eq!(snap.scalar(Gauge::ProductsTotal), 0.0);
        assert_eq!(snap.scalar(Gauge::LastScrapeTimestamp), 0.0);
        assert_eq!(snap.series_count(GaugeFamily::ConfigsTotal), 0);
        // Duration is recorded regardless of outcome.
        assert_eq!(snap.histogram(Histogram::ScrapeDuration).unwrap().count, 1);
    }

    #[tokio::test]
    async fn configs_failure_keeps_previous_values() {
        let api = FakeApi::fixture();
        let scraper = scraper(api);
        let cancel = CancellationToken::new();

        scraper.run_cycle(&cancel).await;
        let committed = scraper.store().snapshot().await;

        scraper_api(&scraper).fail_configs(true);
        let report = scraper.run_cycle(&cancel).await;
        assert_eq!(report.outcome, CycleOutcome::AbortedConfigs);

        let snap = scraper.store().snapshot().await;
        assert_eq!(snap.labeled(GaugeFamily::ConfigsTotal, &product()), Some(1.0));
        assert_eq!(
            snap.scalar(Gauge::LastScrapeTimestamp),
            committed.scalar(Gauge::LastScrapeTimestamp)
        );
        assert_eq!(
            snap.counter(Counter::ScrapeErrors) - committed.counter(Counter::ScrapeErrors),
            1
        );
    }

    #[tokio::test]
    async fn environments_failure_aborts() {
        let api = FakeApi::fixture();
        api.fail_environments(true);
        let scraper = scraper(api);

        let report = scraper.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.outcome, CycleOutcome::AbortedEnvironments);

        let snap = scraper.store().snapshot().await;
        assert_eq!(snap.counter(Counter::ScrapeErrors), 1);
        assert_eq!(snap.series_count(GaugeFamily::ConfigsTotal), 0);
        assert_eq!(scraper_api(&scraper).feature_flag_calls(), 0);
    }

    #[tokio::test]
    async fn stale_flags_failure_aborts() {
        let api = FakeApi::fixture();
        api.fail_stale_flags(true);
        let scraper = scraper(api);

        let report = scraper.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.outcome, CycleOutcome::AbortedStaleFlags);

        let snap = scraper.store().snapshot().await;
        assert_eq!(snap.counter(Counter::ScrapeErrors), 1);
        assert_eq!(snap.series_count(GaugeFamily::EnvironmentsTotal), 0);
        assert_eq!(snap.series_count(GaugeFamily::ZombieFlagsTotal), 0);
    }

    #[tokio::test]
    async fn feature_flag_failure_is_isolated() {
        let api = FakeApi::fixture()
            .with_config("c2", "Config2", 4)
            .with_failing_flags("c1");
        let scraper = scraper(api);

        let report = scraper.run_cycle(&CancellationToken::new()).await;
        assert_eq!(
            report.outcome,
            CycleOutcome::PartialSuccess {
                failed_configs: vec!["c1".to_string()]
            }
        );
        assert_eq!(report.errors, 1);

        let snap = scraper.store().snapshot().await;
        assert_eq!(snap.counter(Counter::ScrapeErrors), 1);
        assert_eq!(
            snap.labeled(GaugeFamily::FeatureFlagsTotal, &config("c1", "Config1")),
            None
        );
        assert_eq!(
            snap.labeled(GaugeFamily::FeatureFlagsTotal, &config("c2", "Config2")),
            Some(4.0)
        );
        assert_eq!(snap.labeled(GaugeFamily::ConfigsTotal, &product()), Some(2.0));
        assert!(snap.scalar(Gauge::LastScrapeTimestamp) > 0.0);
    }

    #[tokio::test]
    async fn every_feature_flag_failure_is_counted() {
        let api = FakeApi::fixture()
            .with_config("c2", "Config2", 4)
            .with_failing_flags("c1")
            .with_failing_flags("c2");
        let scraper = scraper(api);

        let report = scraper.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.errors, 2);
        assert_eq!(scraper.store().counter(Counter::ScrapeErrors).await, 2);
    }

    #[tokio::test]
    async fn zombie_counts_are_per_group() {
        let api = FakeApi::fixture().with_stale_group("c2", "Config2", 3);
        let scraper = scraper(api);

        let report = scraper.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.stale_flags, 5);

        let snap = scraper.store().snapshot().await;
        assert_eq!(
            snap.labeled(GaugeFamily::ZombieFlagsTotal, &config("c1", "Config1")),
            Some(2.0)
        );
        assert_eq!(
            snap.labeled(GaugeFamily::ZombieFlagsTotal, &config("c2", "Config2")),
            Some(3.0)
        );
    }

    #[tokio::test]
    async fn reset_then_cycle_matches_fresh_cycle() {
        let cancel = CancellationToken::new();

        let fresh = scraper(FakeApi::fixture());
        fresh.run_cycle(&cancel).await;

        let reused = scraper(FakeApi::fixture().with_stale_group("c9", "Gone", 1));
        reused.run_cycle(&cancel).await;
        reused.store().reset_all().await;
        scraper_api(&reused).remove_stale_group("c9");
        reused.run_cycle(&cancel).await;

        let a = fresh.store().snapshot().await;
        let b = reused.store().snapshot().await;
        assert_eq!(a.families, b.families);
        assert_eq!(a.scalar(Gauge::ProductsTotal), b.scalar(Gauge::ProductsTotal));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_cycle_is_skipped() {
        let api = FakeApi::fixture().with_flag_delay(Duration::from_secs(5));
        let scraper = scraper(api);
        let cancel = CancellationToken::new();

        let (first, second) = tokio::join!(scraper.run_cycle(&cancel), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            scraper.run_cycle(&cancel).await
        });

        assert_eq!(first.outcome, CycleOutcome::Success);
        assert_eq!(second.outcome, CycleOutcome::Skipped);
        assert_eq!(scraper_api(&scraper).config_calls(), 1);
        assert_eq!(scraper.store().snapshot().await.histogram(Histogram::ScrapeDuration).unwrap().count, 1);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_cycle() {
        let scraper = scraper(FakeApi::fixture());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = scraper.run_cycle(&cancel).await;
        assert_eq!(report.outcome, CycleOutcome::AbortedConfigs);
        assert_eq!(scraper.store().counter(Counter::ScrapeErrors).await, 1);
    }

    fn scraper_api(scraper: &Scraper<FakeApi>) -> &FakeApi {
        scraper.api()
    }
}
