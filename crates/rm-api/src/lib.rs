//! # rm-api
//!
//! REST API for Resman RS: resources, projects, assignments, the approval
//! workflow, timeline projections, dashboard aggregates, and the activity
//! history. All mutation routes run through the workflow engine so the
//! role-dependent bypass lives in exactly one place.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{AppState, AuthenticatedUser, CurrentUser};
pub use routes::router;
