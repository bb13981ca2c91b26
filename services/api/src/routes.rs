use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::infra::AppState;
use govease_transfers::notifications::{notification_router, NotificationDispatcher};
use govease_transfers::realtime::{realtime_router, ConnectionRegistry};
use govease_transfers::transfers::{transfer_router, TransferService};

pub(crate) fn with_service_routes(
    service: Arc<TransferService>,
    dispatcher: Arc<NotificationDispatcher>,
    registry: Arc<ConnectionRegistry>,
) -> Router {
    transfer_router(service)
        .merge(notification_router(dispatcher))
        .merge(realtime_router(registry))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
