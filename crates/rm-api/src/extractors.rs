//! Axum extractors for API handlers
//!
//! Authentication itself happens upstream (the fronting proxy verifies
//! tokens); this service consumes the forwarded identity headers.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use rm_core::config::AppConfig;
use rm_core::traits::{AuthContext, Id};
use rm_models::UserRole;
use rm_services::LedgerStore;
use std::sync::Arc;

use crate::error::ApiError;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// The forwarded caller identity
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Id,
    pub role: UserRole,
}

impl AuthContext for CurrentUser {
    fn user_id(&self) -> Id {
        self.id
    }

    fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Authenticated caller extractor; reads `X-User-Id` and `X-User-Role`.
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Id>().ok())
            .ok_or_else(|| ApiError::unauthorized("missing or invalid X-User-Id header"))?;

        let role = match parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
        {
            Some(value) if value.eq_ignore_ascii_case("admin") => UserRole::Admin,
            Some(value) if value.eq_ignore_ascii_case("devman") => UserRole::DevMan,
            Some(other) => {
                return Err(ApiError::unauthorized(format!(
                    "unknown X-User-Role: {}",
                    other
                )))
            }
            None => return Err(ApiError::unauthorized("missing X-User-Role header")),
        };

        Ok(AuthenticatedUser(CurrentUser { id, role }))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
