//! Project API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rm_core::traits::Id;
use rm_models::{CreateProjectDto, ProjectStatus, UpdateProjectDto};
use rm_services::ProjectLedger;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};
use crate::handlers::resources::require_admin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub manager_id: Option<Id>,
}

/// GET /projects
pub async fn list_projects(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<impl IntoResponse> {
    let ledger = ProjectLedger::new(state.store.clone());
    let views: Vec<_> = ledger
        .list()
        .await?
        .into_iter()
        .filter(|v| query.status.map_or(true, |s| v.project.status == s))
        .filter(|v| query.manager_id.map_or(true, |m| v.project.manager_id == m))
        .collect();
    Ok(Json(views))
}

/// GET /projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let ledger = ProjectLedger::new(state.store.clone());
    Ok(Json(ledger.get(id).await?))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(dto): Json<CreateProjectDto>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&user)?;
    let ledger = ProjectLedger::new(state.store.clone());
    let project = ledger.create(dto).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// PATCH /projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    Json(dto): Json<UpdateProjectDto>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&user)?;
    let ledger = ProjectLedger::new(state.store.clone());
    Ok(Json(ledger.update(id, dto).await?))
}

/// DELETE /projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&user)?;
    let ledger = ProjectLedger::new(state.store.clone());
    ledger.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /projects/:id/resources
pub async fn project_resources(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let ledger = ProjectLedger::new(state.store.clone());
    Ok(Json(ledger.resources(id).await?))
}
