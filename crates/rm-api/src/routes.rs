//! API routes

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use serde::Serialize;

use crate::extractors::AppState;
use crate::handlers::{assignments, dashboard, history, projects, requests, resources};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_router())
}

fn api_v1_router() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .nest("/resources", resources_router())
        .nest("/projects", projects_router())
        .nest("/assignments", assignments_router())
        .nest("/requests", requests_router())
        .nest("/dashboard", dashboard_router())
        .route("/history", get(history::list_history))
}

fn resources_router() -> Router<AppState> {
    Router::new()
        .route("/", get(resources::list_resources))
        .route("/", post(resources::create_resource))
        .route("/:id", get(resources::get_resource))
        .route("/:id", patch(resources::update_resource))
        .route("/:id", delete(resources::delete_resource))
        .route("/:id/assignments", get(resources::resource_assignments))
        .route("/:id/timeline", get(resources::resource_timeline))
}

fn projects_router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects))
        .route("/", post(projects::create_project))
        .route("/:id", get(projects::get_project))
        .route("/:id", patch(projects::update_project))
        .route("/:id", delete(projects::delete_project))
        .route("/:id/resources", get(projects::project_resources))
}

fn assignments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(assignments::create_assignment))
        .route("/:id/extend", post(assignments::extend_assignment))
        .route("/:id/release", post(assignments::release_assignment))
}

fn requests_router() -> Router<AppState> {
    Router::new()
        .route("/", get(requests::list_requests))
        .route("/", post(requests::submit_request))
        .route("/history", get(requests::request_history))
        .route("/:id/approve", post(requests::approve_request))
        .route("/:id/reject", post(requests::reject_request))
}

fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/ending-soon", get(dashboard::ending_soon))
}

async fn api_root() -> axum::Json<ApiRoot> {
    axum::Json(ApiRoot {
        name: "Resman RS".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[derive(Serialize)]
struct ApiRoot {
    name: String,
    version: String,
}
