use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::dispatcher::NotificationDispatcher;

/// Router exposing a citizen's notification feed and read-acknowledgment.
pub fn notification_router(dispatcher: Arc<NotificationDispatcher>) -> Router {
    Router::new()
        .route("/api/v1/notifications/:citizen_id", get(list_handler))
        .route(
            "/api/v1/notifications/:citizen_id/:notification_id/read",
            post(mark_read_handler),
        )
        .route(
            "/api/v1/notifications/:citizen_id/read-all",
            post(mark_all_read_handler),
        )
        .with_state(dispatcher)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    only_unread: bool,
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

async fn list_handler(
    State(dispatcher): State<Arc<NotificationDispatcher>>,
    Path(citizen_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    match dispatcher
        .list(&citizen_id, params.only_unread, params.skip, params.limit)
        .await
    {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

async fn mark_read_handler(
    State(dispatcher): State<Arc<NotificationDispatcher>>,
    Path((citizen_id, notification_id)): Path<(String, String)>,
) -> Response {
    match dispatcher.mark_read(&citizen_id, &notification_id).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "read": true }))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("notification {notification_id} not found") })),
        )
            .into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

async fn mark_all_read_handler(
    State(dispatcher): State<Arc<NotificationDispatcher>>,
    Path(citizen_id): Path<String>,
) -> Response {
    match dispatcher.mark_all_read(&citizen_id).await {
        Ok(updated) => (StatusCode::OK, Json(json!({ "updated": updated }))).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}
