use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::service::{NewTransferRequest, TransferError, TransferService};

/// Router exposing the transfer request and match endpoints.
pub fn transfer_router(service: Arc<TransferService>) -> Router {
    Router::new()
        .route("/api/v1/transfer-requests", post(create_handler))
        .route(
            "/api/v1/transfer-requests/teacher/:teacher_id",
            get(list_handler),
        )
        .route(
            "/api/v1/transfer-requests/:request_id/waiting-list",
            post(waiting_list_handler),
        )
        .route(
            "/api/v1/transfer-requests/:request_id",
            delete(cancel_handler),
        )
        .route(
            "/api/v1/transfer-requests/:request_id/match",
            get(find_match_handler),
        )
        .route(
            "/api/v1/transfer-matches/:matching_id/agree",
            post(agree_handler),
        )
        .route(
            "/api/v1/transfer-matches/:matching_id/disagree",
            post(disagree_handler),
        )
        .with_state(service)
}

fn error_response(error: TransferError) -> Response {
    let status = match &error {
        TransferError::NotEligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TransferError::TeacherNotFound(_)
        | TransferError::RequestNotFound(_)
        | TransferError::MatchNotFound(_) => StatusCode::NOT_FOUND,
        TransferError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

async fn create_handler(
    State(service): State<Arc<TransferService>>,
    Json(payload): Json<NewTransferRequest>,
) -> Response {
    match service.create_request(payload).await {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn list_handler(
    State(service): State<Arc<TransferService>>,
    Path(teacher_id): Path<String>,
) -> Response {
    match service.list_for_teacher(&teacher_id).await {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn waiting_list_handler(
    State(service): State<Arc<TransferService>>,
    Path(request_id): Path<String>,
) -> Response {
    match service.add_to_waiting_list(&request_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "Added to waiting list",
                "request_id": request_id,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

async fn cancel_handler(
    State(service): State<Arc<TransferService>>,
    Path(request_id): Path<String>,
) -> Response {
    match service.cancel_request(&request_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "Transfer request cancelled",
                "request_id": request_id,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

async fn find_match_handler(
    State(service): State<Arc<TransferService>>,
    Path(request_id): Path<String>,
) -> Response {
    match service.find_match(&request_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct AgreementBody {
    request_id: String,
}

async fn agree_handler(
    State(service): State<Arc<TransferService>>,
    Path(matching_id): Path<String>,
    Json(body): Json<AgreementBody>,
) -> Response {
    match service.agree(&matching_id, &body.request_id).await {
        Ok(transfer_match) => (StatusCode::OK, Json(transfer_match)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn disagree_handler(
    State(service): State<Arc<TransferService>>,
    Path(matching_id): Path<String>,
    Json(body): Json<AgreementBody>,
) -> Response {
    match service.disagree(&matching_id, &body.request_id).await {
        Ok(transfer_match) => (StatusCode::OK, Json(transfer_match)).into_response(),
        Err(error) => error_response(error),
    }
}
