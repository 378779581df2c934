//! HTTP ingestion API
//!
//! Terminals post ignition and geofence reports; each accepted report is
//! published to the event channel and answered with `{ rstCd, rstMsg, mdn }`.

pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;
