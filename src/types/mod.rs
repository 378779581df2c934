//! Data types for the vehicle event pipeline
//!
//! This module contains the canonical event record and the enumerations it uses.

mod event_record;
mod event_type;
mod gps_status;
mod response;

pub use event_record::{EventKey, EventRecord};
pub use event_type::VehicleEventType;
pub use gps_status::GpsStatus;
pub use response::EventResponse;
