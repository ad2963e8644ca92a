//! HTTP scrape endpoint

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::authorizer::BearerAuthorizer;
use crate::collector::LabelCollector;
use crate::error::Result;
use crate::metrics::{encode_text, ExporterMetrics};

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    authorizer: Arc<BearerAuthorizer>,
    collector: LabelCollector,
    metrics: ExporterMetrics,
}

impl AppState {
    pub fn new(
        authorizer: BearerAuthorizer,
        collector: LabelCollector,
        metrics: ExporterMetrics,
    ) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
            collector,
            metrics,
        }
    }
}

/// Build the router serving metrics at `metrics_path`
pub fn router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(handle_metrics))
        .with_state(state)
}

async fn handle_metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .map(|value| value.as_bytes())
        .unwrap_or_default();
    if state.authorizer.authorize(auth_header).is_err() {
        warn!("Rejected scrape with invalid authorization header");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut families = state.metrics.gather();
    match state.collector.collect().await {
        Ok(label_families) => families.extend(label_families),
        // Already logged by the collector; serve the process metrics alone
        Err(e) if e.is_remote() => {}
        Err(e) => {
            error!(error = %e, "Failed to build label metrics");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match encode_text(families) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve `app` until `shutdown` is cancelled
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(listen = %addr, "Metrics server listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Metrics server shutting down");
        })
        .await?;

    Ok(())
}
