//! Route handlers.
//!
//! None of these touch the remote API; `/metrics` only reads the last
//! committed scrape from the metric store.

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use tracing::debug;

use flagcount_metrics::CONTENT_TYPE;

use crate::ApiState;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>flagcount exporter</title></head>
<body>
<h1>flagcount exporter</h1>
<p>Feature-flag inventory metrics for Prometheus.</p>
<ul>
<li><a href="/metrics">Metrics</a></li>
<li><a href="/health">Health</a></li>
</ul>
</body>
</html>
"#;

/// Liveness response body.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = state.store.render().await;
    debug!(bytes = body.len(), "serving metrics");
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
