//! Resman RS Server
//!
//! HTTP server binary: loads configuration, connects to PostgreSQL (or
//! falls back to the in-memory store with demo data), starts the periodic
//! expiry sweep, and serves the API.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rm_api::AppState;
use rm_core::config::AppConfig;
use rm_db::{Database, DatabaseConfig, PgLedgerStore};
use rm_services::store::memory::MemoryStore;
use rm_services::{ExpirySweep, LedgerStore};

mod health;
mod seed;

use health::HealthState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        warn!("Failed to load config from env: {}, using defaults", e);
        AppConfig::default()
    });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting Resman RS"
    );

    // Connect to PostgreSQL; fall back to the in-memory store when the
    // database is unreachable so the service stays usable for demos.
    let db_config = DatabaseConfig::with_url(&config.database.url);
    let (store, pool): (Arc<dyn LedgerStore>, _) = match Database::connect(&db_config).await {
        Ok(db) => {
            rm_db::schema::ensure_schema(db.pool()).await?;
            info!("Connected to database");
            (
                Arc::new(PgLedgerStore::new(db.pool().clone())),
                Some(db.pool().clone()),
            )
        }
        Err(e) => {
            warn!(
                "Failed to connect to database: {}. Running with in-memory store.",
                e
            );
            let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
            if let Err(err) = seed::seed_demo_data(store.clone()).await {
                warn!("demo data seeding failed: {}", err);
            }
            (store, None)
        }
    };

    // Periodic expiry sweep.
    if config.sweep.enabled {
        let sweep = ExpirySweep::new(store.clone());
        let interval = Duration::from_secs(config.sweep.interval_seconds);
        tokio::spawn(sweep.run(interval));
        info!(
            interval_seconds = config.sweep.interval_seconds,
            "expiry sweep scheduled"
        );
    }

    let app = build_router(store, config.clone(), pool);

    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rm_server=debug,rm_api=debug,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Build the application router
fn build_router(
    store: Arc<dyn LedgerStore>,
    config: AppConfig,
    pool: Option<sqlx::PgPool>,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(HealthState::new(pool));

    let api_routes = rm_api::router().with_state(AppState::new(store, config));

    Router::new()
        .merge(health_routes)
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        seed::seed_demo_data(store.clone()).await.unwrap();
        build_router(store, AppConfig::default(), None)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_root() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_seeded_resources_visible() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/resources")
                    .header("x-user-id", "1")
                    .header("x-user-role", "ADMIN")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
