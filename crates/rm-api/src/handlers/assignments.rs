//! Assignment mutation handlers
//!
//! All three entry points route through the workflow engine: an admin
//! caller mutates immediately (201/200), anyone else gets a pending
//! request back (202 Accepted). The body shape is shared with the request
//! submission endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rm_core::traits::Id;
use rm_models::RequestPayload;
use rm_services::{SubmitOutcome, WorkflowEngine};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub resource_id: Id,
    pub project_id: Id,
    pub role: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// POST /assignments
pub async fn create_assignment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<AssignBody>,
) -> ApiResult<Response> {
    let engine = WorkflowEngine::new(state.store.clone());
    let outcome = engine
        .submit(
            RequestPayload::Assign {
                resource_id: body.resource_id,
                project_id: body.project_id,
                role: body.role,
                start_date: body.start_date,
                end_date: body.end_date,
            },
            &*user,
        )
        .await?;
    Ok(respond(outcome, StatusCode::CREATED))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendBody {
    pub new_end_date: NaiveDate,
    pub reason: String,
}

/// POST /assignments/:id/extend
pub async fn extend_assignment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    Json(body): Json<ExtendBody>,
) -> ApiResult<Response> {
    let engine = WorkflowEngine::new(state.store.clone());
    let outcome = engine
        .submit(
            RequestPayload::Extend {
                assignment_id: id,
                new_end_date: body.new_end_date,
                current_end_date: None,
                reason: body.reason,
            },
            &*user,
        )
        .await?;
    Ok(respond(outcome, StatusCode::OK))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseBody {
    pub release_date: NaiveDate,
    pub reason: String,
}

/// POST /assignments/:id/release
pub async fn release_assignment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    Json(body): Json<ReleaseBody>,
) -> ApiResult<Response> {
    let engine = WorkflowEngine::new(state.store.clone());
    let outcome = engine
        .submit(
            RequestPayload::Release {
                assignment_id: id,
                release_date: body.release_date,
                reason: body.reason,
            },
            &*user,
        )
        .await?;
    Ok(respond(outcome, StatusCode::OK))
}

fn respond(outcome: SubmitOutcome, applied_status: StatusCode) -> Response {
    match outcome {
        SubmitOutcome::Applied(outcome) => {
            (applied_status, Json(outcome.assignment)).into_response()
        }
        SubmitOutcome::Requested(request) => {
            (StatusCode::ACCEPTED, Json(request)).into_response()
        }
    }
}
