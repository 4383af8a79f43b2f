//! HTTP API for AgentRisk
//!
//! Serves the catalog and runs analyses on uploaded files.

pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::Engine;

/// Largest accepted request body (base64 inflates uploads by a third)
pub const BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Shared state for the web server
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Concurrent analysis workers per request
    pub jobs: usize,
    /// Server start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, jobs: usize) -> Self {
        Self {
            engine,
            jobs,
            started_at: chrono::Utc::now(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/api/catalog", get(routes::get_catalog))
        .route("/api/frameworks", get(routes::get_frameworks))
        .route("/api/analyze", post(routes::analyze))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any))
}

/// Start the web server
pub async fn start_server(listen: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen).await?;

    info!("🌐 AgentRisk API listening on http://{}", listen);

    axum::serve(listener, app).await?;

    Ok(())
}
