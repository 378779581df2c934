//! Wire decoder for terminal payloads
//!
//! Terminals send every value as a string. This module validates those strings
//! against the field contracts and builds an [`EventRecord`](crate::types::EventRecord).
//!
//! - `timestamp`: 14-digit `ccyyMMddHHmmss` parsing and formatting (UTC)
//! - `fields`: contracts shared by all payloads (`mdn`, `gcd`, coordinates, ...)
//! - `ignition`: on/off payloads, event type chosen by which time is set
//! - `geofence`: IN/OUT payloads, event type supplied by the caller
//!
//! A rejected payload lists every offending field, not just the first one.

mod fields;
mod geofence;
mod ignition;
mod timestamp;

pub use fields::{
    DecodedFields, ReportFields, DEVICE_ID, MANUFACTURER_ID, PACKET_VERSION, TERMINAL_ID,
};
pub use geofence::GeofencePayload;
pub use ignition::IgnitionPayload;
pub use timestamp::{format_wire_timestamp, parse_wire_timestamp, WIRE_TIMESTAMP_LEN};
