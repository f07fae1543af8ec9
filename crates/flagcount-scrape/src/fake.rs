//! Scripted in-memory [`FlagApi`] for scraper tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use flagcount_client::{FetchError, FetchResult, FlagApi};
use flagcount_core::*;

pub(crate) struct FakeApi {
    configs: Mutex<Vec<(Config, usize)>>,
    environments: Vec<Environment>,
    stale_groups: Mutex<Vec<StaleConfig>>,
    failing_flags: Mutex<HashSet<String>>,
    fail_configs: AtomicBool,
    fail_environments: AtomicBool,
    fail_stale_flags: AtomicBool,
    flag_delay: Option<Duration>,
    first_config_delay: Mutex<Option<Duration>>,
    config_calls: AtomicUsize,
    feature_flag_calls: AtomicUsize,
}

impl FakeApi {
    /// One config `c1` with 3 flags, one environment, and a stale group
    /// for `c1` holding 2 settings.
    pub(crate) fn fixture() -> Self {
        Self {
            configs: Mutex::new(vec![(config("c1", "Config1"), 3)]),
            environments: vec![Environment {
                environment_id: "e1".to_string(),
                name: "Env1".to_string(),
            }],
            stale_groups: Mutex::new(vec![stale_group("c1", "Config1", 2)]),
            failing_flags: Mutex::new(HashSet::new()),
            fail_configs: AtomicBool::new(false),
            fail_environments: AtomicBool::new(false),
            fail_stale_flags: AtomicBool::new(false),
            flag_delay: None,
            first_config_delay: Mutex::new(None),
            config_calls: AtomicUsize::new(0),
            feature_flag_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_config(self, id: &str, name: &str, flags: usize) -> Self {
        self.configs.lock().unwrap().push((config(id, name), flags));
        self
    }

    pub(crate) fn with_stale_group(self, id: &str, name: &str, settings: usize) -> Self {
        self.stale_groups
            .lock()
            .unwrap()
            .push(stale_group(id, name, settings));
        self
    }

    pub(crate) fn with_failing_flags(self, config_id: &str) -> Self {
        self.failing_flags
            .lock()
            .unwrap()
            .insert(config_id.to_string());
        self
    }

    /// Delay every feature-flag fetch.
    pub(crate) fn with_flag_delay(mut self, delay: Duration) -> Self {
        self.flag_delay = Some(delay);
        self
    }

    /// Delay only the first configs fetch.
    pub(crate) fn with_first_config_delay(self, delay: Duration) -> Self {
        *self.first_config_delay.lock().unwrap() = Some(delay);
        self
    }

    pub(crate) fn fail_configs(&self, fail: bool) {
        self.fail_configs.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_environments(&self, fail: bool) {
        self.fail_environments.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_stale_flags(&self, fail: bool) {
        self.fail_stale_flags.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn remove_stale_group(&self, config_id: &str) {
        self.stale_groups
            .lock()
            .unwrap()
            .retain(|g| g.config_id != config_id);
    }

    pub(crate) fn config_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn feature_flag_calls(&self) -> usize {
        self.feature_flag_calls.load(Ordering::SeqCst)
    }
}

fn config(id: &str, name: &str) -> Config {
    Config {
        config_id: id.to_string(),
        name: name.to_string(),
    }
}

fn stale_group(id: &str, name: &str, settings: usize) -> StaleConfig {
    StaleConfig {
        config_id: id.to_string(),
        name: name.to_string(),
        settings: (0..settings)
            .map(|i| StaleSetting {
                setting_id: i as i64,
                key: format!("{id}_stale_{i}"),
                ..StaleSetting::default()
            })
            .collect(),
        ..StaleConfig::default()
    }
}

fn unavailable(endpoint: String) -> FetchError {
    FetchError::Status {
        endpoint,
        status: 503,
    }
}

/// Sleep for `delay` unless `cancel` fires first.
async fn wait(cancel: &CancellationToken, delay: Option<Duration>, endpoint: &str) -> FetchResult<()> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled {
            endpoint: endpoint.to_string(),
        });
    }
    if let Some(delay) = delay {
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { endpoint: endpoint.to_string() });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
    Ok(())
}

impl FlagApi for FakeApi {
    async fn fetch_configs(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> FetchResult<Vec<Config>> {
        let endpoint = format!("/v1/products/{product_id}/configs");
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.first_config_delay.lock().unwrap().take();
        wait(cancel, delay, &endpoint).await?;
        if self.fail_configs.load(Ordering::SeqCst) {
            return Err(unavailable(endpoint));
        }
        Ok(self
            .configs
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn fetch_environments(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> FetchResult<Vec<Environment>> {
        let endpoint = format!("/v1/products/{product_id}/environments");
        wait(cancel, None, &endpoint).await?;
        if self.fail_environments.load(Ordering::SeqCst) {
            return Err(unavailable(endpoint));
        }
        Ok(self.environments.clone())
    }

    async fn fetch_feature_flags(
        &self,
        cancel: &CancellationToken,
        config_id: &str,
    ) -> FetchResult<Vec<FeatureFlag>> {
        let endpoint = format!("/v1/configs/{config_id}/settings");
        self.feature_flag_calls.fetch_add(1, Ordering::SeqCst);
        wait(cancel, self.flag_delay, &endpoint).await?;
        if self.failing_flags.lock().unwrap().contains(config_id) {
            return Err(unavailable(endpoint));
        }
        let count = self
            .configs
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| c.config_id == config_id)
            .map_or(0, |(_, n)| *n);
        Ok((0..count)
            .map(|i| FeatureFlag {
                setting_id: i as i64,
                key: format!("{config_id}_flag_{i}"),
                name: format!("Flag {i}"),
                hint: None,
            })
            .collect())
    }

    async fn fetch_stale_flags(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> FetchResult<StaleFlagReport> {
        let endpoint = format!("/v1/products/{product_id}/staleflags");
        wait(cancel, None, &endpoint).await?;
        if self.fail_stale_flags.load(Ordering::SeqCst) {
            return Err(unavailable(endpoint));
        }
        Ok(StaleFlagReport {
            product_id: product_id.to_string(),
            name: "Shop".to_string(),
            configs: self.stale_groups.lock().unwrap().clone(),
            environments: self.environments.clone(),
        })
    }
}
