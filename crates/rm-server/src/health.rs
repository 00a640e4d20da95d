//! Health check endpoints
//!
//! Liveness is unconditional; readiness pings the database when one is
//! attached (memory-store runs are always ready).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;

/// State for the health routes
#[derive(Clone)]
pub struct HealthState {
    pub pool: Option<PgPool>,
    pub started: Arc<Instant>,
}

impl HealthState {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self {
            pool,
            started: Arc::new(Instant::now()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database: &'static str,
}

/// GET /health
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let (status, database) = match &state.pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => (HealthStatus::Healthy, "connected"),
            Err(_) => (HealthStatus::Unhealthy, "unreachable"),
        },
        None => (HealthStatus::Healthy, "in-memory"),
    };

    let report = HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started.elapsed().as_secs(),
        database,
    };
    let code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
pub async fn readiness(State(state): State<HealthState>) -> StatusCode {
    match &state.pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => StatusCode::OK,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        },
        None => StatusCode::OK,
    }
}
