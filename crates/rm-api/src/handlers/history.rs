//! Activity history handlers

use axum::{extract::State, response::IntoResponse, Json};

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /history
pub async fn list_history(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.store.history().await?))
}
