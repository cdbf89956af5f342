//! HTTP API for exposing gatekeeper stats.

use crate::Gatekeeper;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use guildhall_error::{GuildhallResult, ServerError, ServerErrorKind};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// API state holding the gatekeeper.
#[derive(Clone)]
pub struct ApiState {
    gatekeeper: Arc<Gatekeeper>,
}

impl ApiState {
    /// Creates new API state.
    pub fn new(gatekeeper: Arc<Gatekeeper>) -> Self {
        Self { gatekeeper }
    }
}

/// Creates the monitoring router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .with_state(state)
}

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Current stats snapshot.
pub async fn get_stats(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.gatekeeper.stats()))
}

/// Serve the monitoring API on `addr` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<F>(gatekeeper: Arc<Gatekeeper>, addr: &str, shutdown: F) -> GuildhallResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::new(ServerErrorKind::Bind(format!("{}: {}", addr, e))))?;

    info!(addr, "Monitoring API listening");

    axum::serve(listener, create_router(ApiState::new(gatekeeper)))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::new(ServerErrorKind::Serve(e.to_string())))?;

    info!("Monitoring API stopped");
    Ok(())
}
