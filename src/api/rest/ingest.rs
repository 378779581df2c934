//! Terminal report ingestion
//!
//! Each endpoint decodes the body, publishes the record to the event channel
//! and answers once the record is accepted. Processing happens later in the
//! consumer, so handler rejections never reach the terminal.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::api::state::AppState;
use crate::decoder::{GeofencePayload, IgnitionPayload};
use crate::error::PayloadRejection;
use crate::types::{EventRecord, EventResponse, VehicleEventType};

type IngestResponse = (StatusCode, Json<EventResponse>);

/// POST /api/v1/vehicle/ignition
pub async fn ignition(State(state): State<Arc<AppState>>, body: String) -> IngestResponse {
    let payload: IgnitionPayload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let decoded = payload.decode(Some(body));
    accept(&state, decoded).await
}

/// POST /api/v1/vehicle/geofence/in
pub async fn geofence_in(State(state): State<Arc<AppState>>, body: String) -> IngestResponse {
    geofence(&state, VehicleEventType::GeofenceIn, body).await
}

/// POST /api/v1/vehicle/geofence/out
pub async fn geofence_out(State(state): State<Arc<AppState>>, body: String) -> IngestResponse {
    geofence(&state, VehicleEventType::GeofenceOut, body).await
}

async fn geofence(state: &AppState, event_type: VehicleEventType, body: String) -> IngestResponse {
    let payload: GeofencePayload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let decoded = payload.decode(event_type, Some(body));
    accept(state, decoded).await
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, IngestResponse> {
    serde_json::from_str(body).map_err(|e| {
        // Echo the terminal id back when the body is at least a JSON object
        let mdn = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("mdn")?.as_str().map(str::to_string));
        warn!(mdn = ?mdn, error = %e, "Rejected unreadable request body");
        (
            StatusCode::BAD_REQUEST,
            Json(EventResponse::bad_request(mdn, vec![format!("body: {}", e)])),
        )
    })
}

async fn accept(state: &AppState, decoded: Result<EventRecord, PayloadRejection>) -> IngestResponse {
    let record = match decoded {
        Ok(record) => record,
        Err(rejection) => {
            warn!(
                mdn = ?rejection.mdn,
                errors = rejection.errors.len(),
                "{}",
                rejection
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(EventResponse::bad_request(rejection.mdn.clone(), rejection.messages())),
            );
        }
    };

    let mdn = record.mdn.clone();
    let event_type = record.event_type;
    match state.publisher.publish(record).await {
        Ok((partition, offset)) => {
            debug!(mdn = %mdn, event_type = %event_type, partition, offset, "Accepted event");
            (StatusCode::OK, Json(EventResponse::ok(mdn)))
        }
        Err(e) => {
            error!(mdn = %mdn, event_type = %event_type, error = %e, "Failed to publish event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EventResponse::internal_error(Some(mdn))),
            )
        }
    }
}
