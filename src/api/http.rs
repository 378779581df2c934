//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::rest::{events, ingest};
use super::state::AppState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/vehicle/ignition", post(ingest::ignition))
        .route("/api/v1/vehicle/geofence/in", post(ingest::geofence_in))
        .route("/api/v1/vehicle/geofence/out", post(ingest::geofence_out))
        .route("/api/v1/vehicle/:mdn/events", get(events::list_events))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
