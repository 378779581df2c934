//! REST endpoints
//!
//! - `POST /api/v1/vehicle/ignition` - ignition on/off report
//! - `POST /api/v1/vehicle/geofence/in` - geofence entry
//! - `POST /api/v1/vehicle/geofence/out` - geofence exit
//! - `GET /api/v1/vehicle/:mdn/events` - recent stored events of a terminal

pub mod events;
pub mod ingest;

use serde::Serialize;

/// Wrapper for query responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    /// Number of items in `data`
    pub total: usize,
}

/// Error body for query endpoints
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "INTERNAL_ERROR".to_string(),
        }
    }
}
