//! HTTP endpoint serving the update manifest
//!
//! A single route, `GET /`, answers every request with `200` and the
//! current manifest as JSON. Upstream failures never surface as HTTP
//! errors; [`ManifestService::handle`] degrades to the cached or empty
//! manifest instead.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::app::models::ReleaseManifest;
use crate::app::service::ManifestService;
use crate::errors::{AppError, Result};

/// State shared with the route handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<ManifestService>,
}

impl AppState {
    pub fn new(service: Arc<ManifestService>) -> Self {
        Self { service }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(get_manifest))
        .with_state(app_state)
}

async fn get_manifest(State(state): State<AppState>, headers: HeaderMap) -> Json<ReleaseManifest> {
    let user_agent = headers.get(USER_AGENT).and_then(|value| value.to_str().ok());
    debug!("GET / from {}", user_agent.unwrap_or("<no user agent>"));

    let manifest = state.service.handle(user_agent).await;
    Json(manifest.as_ref().clone())
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(service: Arc<ManifestService>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        AppError::generic(format!("Failed to bind HTTP listener to {}: {}", addr, e))
    })?;
    info!("Serving update manifest on http://{}", addr);

    let app = build_router(AppState::new(service));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
