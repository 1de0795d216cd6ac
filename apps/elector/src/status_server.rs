use std::net::SocketAddr;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use leaderlease_application::{LeaderStatusReader, ShutdownSignal};
use leaderlease_core::{AppError, AppResult};
use leaderlease_domain::LeaderSnapshot;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Current leader name, empty while unknown.
#[derive(Debug, Serialize)]
pub struct LeaderNameResponse {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Clone)]
struct StatusState {
    status: LeaderStatusReader,
}

pub fn build_router(status: LeaderStatusReader) -> Router {
    Router::new()
        .route("/", get(leader_name_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(StatusState { status })
}

pub async fn bind(address: SocketAddr) -> AppResult<TcpListener> {
    TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind status listener: {error}")))
}

/// Serves the status endpoint until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: ShutdownSignal,
) -> AppResult<()> {
    if let Ok(address) = listener.local_addr() {
        info!(%address, "leaderlease-elector status endpoint listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await
        .map_err(|error| AppError::Internal(format!("status server error: {error}")))
}

async fn leader_name_handler(State(state): State<StatusState>) -> Json<LeaderNameResponse> {
    Json(LeaderNameResponse {
        name: state.status.current_leader(),
    })
}

async fn status_handler(State(state): State<StatusState>) -> Json<LeaderSnapshot> {
    Json(state.status.snapshot())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
