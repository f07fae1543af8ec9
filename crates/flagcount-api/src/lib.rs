//! flagcount-api: HTTP surface of the exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Static index page |
//! | GET | `/health` | Liveness check |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use flagcount_metrics::MetricStore;

/// Shared state for handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<MetricStore>,
}

/// Build the exporter router.
pub fn build_router(store: Arc<MetricStore>) -> Router {
    let state = ApiState { store };

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
