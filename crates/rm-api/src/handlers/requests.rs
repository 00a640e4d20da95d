//! Request workflow handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rm_core::traits::{AuthContext, Id};
use rm_models::{RequestFilter, RequestKind, RequestPayload, RequestStatus};
use rm_services::{SubmitOutcome, WorkflowEngine};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestKind>,
    pub requester_id: Option<Id>,
}

/// GET /requests
pub async fn list_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> ApiResult<impl IntoResponse> {
    let engine = WorkflowEngine::new(state.store.clone());
    // Managers only see their own submissions.
    let requester_id = if user.is_admin() {
        query.requester_id
    } else {
        Some(user.id)
    };
    let requests = engine
        .requests(RequestFilter {
            status: query.status,
            kind: query.kind,
            requester_id,
            terminal_only: false,
        })
        .await?;
    Ok(Json(requests))
}

/// GET /requests/history — terminal requests only
pub async fn request_history(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let engine = WorkflowEngine::new(state.store.clone());
    Ok(Json(engine.request_history().await?))
}

/// POST /requests
///
/// The body is a tagged payload (`kind` = ASSIGN | EXTEND | RELEASE |
/// PROJECT). Admin callers are applied immediately; others are queued.
pub async fn submit_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RequestPayload>,
) -> ApiResult<Response> {
    let engine = WorkflowEngine::new(state.store.clone());
    let outcome = engine.submit(payload, &*user).await?;
    Ok(match outcome {
        SubmitOutcome::Applied(outcome) => {
            (StatusCode::CREATED, Json(serde_json::json!({
                "applied": true,
                "assignment": outcome.assignment,
                "project": outcome.project,
            })))
            .into_response()
        }
        SubmitOutcome::Requested(request) => {
            (StatusCode::ACCEPTED, Json(request)).into_response()
        }
    })
}

/// POST /requests/:id/approve
pub async fn approve_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let engine = WorkflowEngine::new(state.store.clone());
    Ok(Json(engine.approve(id, &*user).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectBody {
    pub reason: String,
}

/// POST /requests/:id/reject
pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    Json(body): Json<RejectBody>,
) -> ApiResult<impl IntoResponse> {
    let engine = WorkflowEngine::new(state.store.clone());
    Ok(Json(engine.reject(id, &*user, &body.reason).await?))
}
