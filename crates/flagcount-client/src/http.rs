//! HTTP implementation of [`FlagApi`].
//!
//! Issues authenticated GET requests against the API base address and
//! decodes JSON bodies. Anything other than a 2xx status, a transport
//! failure, or a body that does not decode is a [`FetchError`].

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use flagcount_core::{Config, Environment, FeatureFlag, ScrapeTarget, StaleFlagReport};

use crate::api::FlagApi;
use crate::error::{FetchError, FetchResult};

const USER_AGENT: &str = concat!("flagcount/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed client for the remote feature-flag API.
#[derive(Debug, Clone)]
pub struct HttpFlagApi {
    client: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl HttpFlagApi {
    /// Create a client for `target` with an overall per-request timeout.
    pub fn new(target: &ScrapeTarget, timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Setup)?;

        Ok(Self {
            client,
            base_url: target.api_url().trim_end_matches('/').to_string(),
            authorization: format!("Basic {}", target.credential()),
        })
    }

    /// Base address requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `endpoint` and decode the body as `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        endpoint: String,
    ) -> FetchResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);

        let request = async {
            let resp = self
                .client
                .get(&url)
                .header(AUTHORIZATION, &self.authorization)
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await
                .map_err(|source| FetchError::Request {
                    endpoint: endpoint.clone(),
                    source,
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    endpoint: endpoint.clone(),
                    status: status.as_u16(),
                });
            }

            let body = resp.bytes().await.map_err(|source| FetchError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

            serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
                endpoint: endpoint.clone(),
                source,
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled { endpoint: endpoint.clone() }),
            result = request => result,
        }
    }
}

impl FlagApi for HttpFlagApi {
    async fn fetch_configs(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> FetchResult<Vec<Config>> {
        let configs: Vec<Config> = self
            .get_json(cancel, format!("/v1/products/{product_id}/configs"))
            .await?;
        debug!(%product_id, count = configs.len(), "retrieved configs");
        Ok(configs)
    }

    async fn fetch_environments(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> FetchResult<Vec<Environment>> {
        let environments: Vec<Environment> = self
            .get_json(cancel, format!("/v1/products/{product_id}/environments"))
            .await?;
        debug!(%product_id, count = environments.len(), "retrieved environments");
        Ok(environments)
    }

    async fn fetch_feature_flags(
        &self,
        cancel: &CancellationToken,
        config_id: &str,
    ) -> FetchResult<Vec<FeatureFlag>> {
        let flags: Vec<FeatureFlag> = self
            .get_json(cancel, format!("/v1/configs/{config_id}/settings"))
            .await?;
        debug!(%config_id, count = flags.len(), "retrieved feature flags");
        Ok(flags)
    }

    async fn fetch_stale_flags(
        &self,
        cancel: &CancellationToken,
        product_id: &str,
    ) -> FetchResult<StaleFlagReport> {
        let report: StaleFlagReport = self
            .get_json(cancel, format!("/v1/products/{product_id}/staleflags"))
            .await?;
        debug!(%product_id, groups = report.configs.len(), "retrieved stale flags");
        Ok(report)
    }
}
