use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use streamhook_core::dedupe::{DedupeCache, LastDelivery};

use crate::dispatch::Dispatcher;
use crate::{telemetry, webhook};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    webhook_secret: Arc<[u8]>,
    dedupe: Arc<DedupeCache>,
    last_delivery: Arc<LastDelivery>,
    dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        webhook_secret: Arc<[u8]>,
        dedupe: Arc<DedupeCache>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            metrics,
            webhook_secret,
            dedupe,
            last_delivery: Arc::new(LastDelivery::new()),
            dispatcher,
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn webhook_secret(&self) -> Arc<[u8]> {
        self.webhook_secret.clone()
    }

    pub fn dedupe(&self) -> &DedupeCache {
        &self.dedupe
    }

    /// Fast-path slot shared by every in-flight request.
    pub fn last_delivery(&self) -> &LastDelivery {
        &self.last_delivery
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(webhook::routes())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
        .into_response()
}
