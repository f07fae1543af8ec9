//! flagcountd: the flagcount exporter daemon.
//!
//! Polls the remote feature-flag API on a fixed interval and serves the
//! resulting counts for Prometheus:
//! - Scrape scheduler (background task)
//! - Metric store
//! - HTTP server: `/`, `/health`, `/metrics`
//!
//! # Usage
//!
//! ```text
//! flagcountd --api-key $KEY --organization-id org --product-id prod --port 8080
//! ```
//!
//! Every flag can also be set through its environment variable; an
//! explicit flag wins over the environment.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flagcount_client::HttpFlagApi;
use flagcount_core::config::{
    DEFAULT_API_URL, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCRAPE_INTERVAL_SECS,
};
use flagcount_core::{ExporterConfig, LogFormat};
use flagcount_metrics::MetricStore;
use flagcount_scrape::{Scraper, run_scheduler};

/// How long in-flight HTTP requests get to finish on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(
    name = "flagcountd",
    version,
    about = "Export feature-flag inventory metrics to Prometheus"
)]
struct Cli {
    /// API credential.
    #[arg(
        long,
        env = "FLAGCOUNT_API_KEY",
        hide_env_values = true,
        default_value = "",
        hide_default_value = true
    )]
    api_key: String,

    /// Organization ID.
    #[arg(
        long,
        env = "FLAGCOUNT_ORGANIZATION_ID",
        default_value = "",
        hide_default_value = true
    )]
    organization_id: String,

    /// Product ID to scrape.
    #[arg(
        long,
        env = "FLAGCOUNT_PRODUCT_ID",
        default_value = "",
        hide_default_value = true
    )]
    product_id: String,

    /// Base address of the feature-flag API.
    #[arg(long, env = "FLAGCOUNT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Scrape interval in seconds.
    #[arg(long, env = "SCRAPE_INTERVAL", default_value_t = DEFAULT_SCRAPE_INTERVAL_SECS)]
    scrape_interval: u64,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log level (debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (text, json).
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Per-request timeout against the API, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout: u64,
}

impl Cli {
    fn into_config(self) -> ExporterConfig {
        ExporterConfig {
            api_key: self.api_key,
            organization_id: self.organization_id,
            product_id: self.product_id,
            api_url: self.api_url,
            scrape_interval_secs: self.scrape_interval,
            port: self.port,
            log_level: self.log_level,
            log_format: self.log_format,
            request_timeout_secs: self.request_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config();
    config.validate()?;

    init_tracing(&config);
    run(config).await
}

/// Install the global subscriber. `RUST_LOG` overrides `--log-level`.
fn init_tracing(config: &ExporterConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_directive()));

    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    info!(
        port = config.port,
        scrape_interval = config.scrape_interval_secs,
        log_level = %config.log_level,
        organization_id = %config.organization_id,
        product_id = %config.product_id,
        "flagcount exporter starting"
    );

    // ── Initialize subsystems ──────────────────────────────────

    let store = Arc::new(MetricStore::new());
    let target = config.target();
    let api = HttpFlagApi::new(&target, config.request_timeout())?;
    info!(api_url = %api.base_url(), "API client initialized");

    let scraper = Arc::new(Scraper::new(api, store.clone(), target));

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let abort = CancellationToken::new();

    // ── Start scrape scheduler ─────────────────────────────────

    let mut scrape_handle = {
        let scraper = scraper.clone();
        let abort = abort.clone();
        let interval = config.scrape_interval();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { run_scheduler(&scraper, interval, shutdown, abort).await })
    };

    // ── Start HTTP server ──────────────────────────────────────

    let router = flagcount_api::build_router(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server starting");

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    });
    let mut server_handle = tokio::spawn(async move { server.await });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
        result = &mut server_handle => {
            // The server stopped on its own; take the scheduler down too.
            let _ = shutdown_tx.send(true);
            abort.cancel();
            let _ = scrape_handle.await;
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(e.into()),
            };
        }
    }

    // Stop scheduling first, then give the server its grace period.
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle).await {
        Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server error"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task failed"),
        Err(_) => {
            warn!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "HTTP server did not drain in time, forcing close"
            );
            server_handle.abort();
        }
    }

    // Let the in-flight cycle commit. A second signal aborts it.
    let cycles = tokio::select! {
        result = &mut scrape_handle => result.unwrap_or_default(),
        _ = shutdown_signal() => {
            warn!("second shutdown signal, aborting in-flight scrape");
            abort.cancel();
            (&mut scrape_handle).await.unwrap_or_default()
        }
    };

    info!(cycles, "flagcount exporter stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
