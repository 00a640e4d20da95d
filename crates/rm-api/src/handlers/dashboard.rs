//! Dashboard handlers

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use rm_services::DashboardService;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /dashboard/stats
pub async fn stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let dashboard = DashboardService::new(state.store.clone());
    Ok(Json(
        dashboard.stats(&*user, Utc::now().date_naive()).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct EndingSoonQuery {
    pub days: Option<i64>,
}

/// GET /dashboard/ending-soon
pub async fn ending_soon(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<EndingSoonQuery>,
) -> ApiResult<impl IntoResponse> {
    let days = query
        .days
        .unwrap_or(state.config.instance.ending_soon_days);
    let dashboard = DashboardService::new(state.store.clone());
    Ok(Json(
        dashboard
            .ending_soon(&*user, Utc::now().date_naive(), days)
            .await?,
    ))
}
