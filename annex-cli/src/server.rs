//! HTTP endpoints: `/metrics`, `/healthz` and a small index page.

use std::sync::Arc;

use annex_engine::ReadinessGate;
use annex_telemetry::{MetricsRecorder, TelemetryError};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

const INDEX_PAGE: &str = "<html>\
<head><title>Annotations Exporter</title></head>\
<body><h1>Annotations Exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body>\
</html>";

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsRecorder>,
    pub readiness: Arc<ReadinessGate>,
}

#[derive(Debug)]
pub struct MetricsError(TelemetryError);

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Failed to encode metrics");
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}

/// Serves until `token` is cancelled, then drains open connections.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    token: CancellationToken,
) -> std::io::Result<()> {
    info!(address = ?listener.local_addr().ok(), "Serving metrics");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MetricsError> {
    let body = state.metrics.gather_metrics().map_err(MetricsError)?;
    debug!(bytes = body.len(), "Rendered metrics");
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body))
}

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.readiness.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}
