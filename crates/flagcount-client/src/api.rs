//! The read-only contract the scraper relies on.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use flagcount_core::{Config, Environment, FeatureFlag, StaleFlagReport};

use crate::error::FetchResult;

/// Read operations against the remote feature-flag API.
///
/// Each call is a single round trip. When `cancel` fires the call must
/// give up immediately and return [`FetchError::Cancelled`].
///
/// [`FetchError::Cancelled`]: crate::FetchError::Cancelled
pub trait FlagApi: Send + Sync {
    /// All configs of a product.
    fn fetch_configs(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> impl Future<Output = FetchResult<Vec<Config>>> + Send;

    /// All environments of a product.
    fn fetch_environments(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> impl Future<Output = FetchResult<Vec<Environment>>> + Send;

    /// All feature flags defined in a config.
    fn fetch_feature_flags(
        &self,
        cancel: &CancellationToken,
        config_id: &str,
    ) -> impl Future<Output = FetchResult<Vec<FeatureFlag>>> + Send;

    /// The stale-flag report of a product.
    fn fetch_stale_flags(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> impl Future<Output = FetchResult<StaleFlagReport>> + Send;
}
