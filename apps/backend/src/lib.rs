pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mastery_core::StaticCatalog;

use crate::config::Config;
use crate::db::Database;
use crate::error::{ApiError, Result};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub catalog: Arc<StaticCatalog>,
    pub config: Arc<Config>,
}

/// Load the skill catalog, or an empty one when no path is configured.
pub fn load_catalog(path: Option<&Path>) -> Result<StaticCatalog> {
    let Some(path) = path else {
        tracing::warn!("CATALOG_PATH not set, using fallback skill lookup only");
        return Ok(StaticCatalog::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        ApiError::Internal(format!("cannot read catalog {}: {}", path.display(), e))
    })?;
    let catalog = StaticCatalog::from_json(&content)?;
    tracing::info!(skills = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// Build the router with every route.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/learners/:learner_id/sessions",
            post(routes::sessions::record),
        )
        .route(
            "/api/learners/:learner_id/attempts/:attempt_id",
            get(routes::sessions::get_attempt),
        )
        .route(
            "/api/learners/:learner_id/summary",
            get(routes::progress::summary),
        )
        .route(
            "/api/learners/:learner_id/skills",
            get(routes::progress::skills),
        )
        .route(
            "/api/learners/:learner_id/progression/:subject_id",
            get(routes::progress::progression),
        )
        .route(
            "/api/learners/:learner_id/questions/select",
            post(routes::questions::select_questions),
        )
        .route(
            "/api/learners/:learner_id/recommendation",
            post(routes::recommendations::recommendation),
        )
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url, config.db_max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let catalog = load_catalog(config.catalog_path.as_deref())?;

    let addr = config.bind_addr();
    let state = AppState {
        db: Arc::new(db),
        catalog: Arc::new(catalog),
        config: Arc::new(config),
    };

    let app = app(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
