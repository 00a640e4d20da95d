//! Resource API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rm_core::traits::Id;
use rm_models::{Assignment, CreateResourceDto, ResourceStatus, UpdateResourceDto};
use rm_services::{PositionedBar, ResourceFilters, ResourceLedger, TimelineService};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuery {
    pub status: Option<ResourceStatus>,
    pub role: Option<String>,
    pub as_of: Option<NaiveDate>,
    pub search: Option<String>,
}

/// GET /resources
pub async fn list_resources(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<impl IntoResponse> {
    let ledger = ResourceLedger::new(state.store.clone());
    let filters = ResourceFilters {
        status: query.status,
        role: query.role,
        as_of: query.as_of,
        search: query.search,
    };
    let views = ledger.list(&filters, Utc::now().date_naive()).await?;
    Ok(Json(views))
}

/// GET /resources/:id
pub async fn get_resource(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let ledger = ResourceLedger::new(state.store.clone());
    let view = ledger.get(id, Utc::now().date_naive()).await?;
    Ok(Json(view))
}

/// POST /resources
pub async fn create_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(dto): Json<CreateResourceDto>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&user)?;
    let ledger = ResourceLedger::new(state.store.clone());
    let resource = ledger.create(dto).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

/// PATCH /resources/:id
pub async fn update_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    Json(dto): Json<UpdateResourceDto>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&user)?;
    let ledger = ResourceLedger::new(state.store.clone());
    let resource = ledger.update(id, dto).await?;
    Ok(Json(resource))
}

/// DELETE /resources/:id
pub async fn delete_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&user)?;
    let ledger = ResourceLedger::new(state.store.clone());
    ledger.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /resources/:id/assignments
pub async fn resource_assignments(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Vec<Assignment>>> {
    let ledger = ResourceLedger::new(state.store.clone());
    Ok(Json(ledger.assignments(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineQuery {
    /// Center of the month window; defaults to today
    pub as_of: Option<NaiveDate>,
}

/// GET /resources/:id/timeline
pub async fn resource_timeline(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<Vec<PositionedBar>>> {
    let today = Utc::now().date_naive();
    let center = query.as_of.unwrap_or(today);
    let timeline = TimelineService::new(state.store.clone());
    Ok(Json(timeline.for_resource(id, center, today).await?))
}

pub(crate) fn require_admin(user: &AuthenticatedUser) -> Result<(), ApiError> {
    if user.role == rm_models::UserRole::Admin {
        Ok(())
    } else {
        Err(ApiError::from(rm_core::error::RmError::forbidden(
            "administrator role required",
        )))
    }
}
