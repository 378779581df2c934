//! Stored event lookup

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::error;

use super::{ApiError, ApiResponse};
use crate::api::state::AppState;

/// Query parameters for listing a terminal's events
#[derive(Debug, Deserialize)]
pub struct EventsParams {
    /// Maximum number of events to return (default: 100, max: 1000)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

impl EventsParams {
    pub fn normalized_limit(&self) -> usize {
        self.limit.min(1000)
    }
}

/// GET /api/v1/vehicle/:mdn/events - newest first
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(mdn): Path<String>,
    Query(params): Query<EventsParams>,
) -> impl IntoResponse {
    match state.store.find_by_key(&mdn, params.normalized_limit()) {
        Ok(events) => {
            let total = events.len();
            (StatusCode::OK, Json(ApiResponse { data: events, total })).into_response()
        }
        Err(e) => {
            error!(mdn = %mdn, error = %e, "Failed to read events");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal(e.to_string())),
            )
                .into_response()
        }
    }
}
