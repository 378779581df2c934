//! Canonical vehicle event record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GpsStatus, VehicleEventType};

/// Identity of a stored event: one terminal, one instant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    pub mdn: String,
    #[serde(rename = "eventTimestampUtc")]
    pub event_timestamp_utc: DateTime<Utc>,
}

impl EventKey {
    pub fn new(mdn: impl Into<String>, event_timestamp_utc: DateTime<Utc>) -> Self {
        Self {
            mdn: mdn.into(),
            event_timestamp_utc,
        }
    }
}

/// One normalized event reported by a tracking terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub mdn: String,
    #[serde(rename = "eventTimestampUtc")]
    pub event_timestamp_utc: DateTime<Utc>,
    #[serde(rename = "eventType")]
    pub event_type: VehicleEventType,
    #[serde(rename = "gpsStatus")]
    pub gps_status: GpsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
    #[serde(
        rename = "accumulatedDistanceMeters",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub accumulated_distance_meters: Option<u64>,
    #[serde(rename = "batteryVolt", default, skip_serializing_if = "Option::is_none")]
    pub battery_volt: Option<u32>,
    #[serde(rename = "onTime", default, skip_serializing_if = "Option::is_none")]
    pub on_time: Option<DateTime<Utc>>,
    #[serde(rename = "ignitionOffTime", default, skip_serializing_if = "Option::is_none")]
    pub ignition_off_time: Option<DateTime<Utc>>,
    #[serde(rename = "geofenceGroupId", default, skip_serializing_if = "Option::is_none")]
    pub geofence_group_id: Option<String>,
    #[serde(rename = "geofencePointId", default, skip_serializing_if = "Option::is_none")]
    pub geofence_point_id: Option<String>,
    #[serde(rename = "eventValue", default, skip_serializing_if = "Option::is_none")]
    pub event_value: Option<String>,
    #[serde(rename = "rawPayload", default, skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<String>,
}

impl EventRecord {
    /// Create a record with only identity, type and GPS status set
    pub fn new(
        mdn: impl Into<String>,
        event_timestamp_utc: DateTime<Utc>,
        event_type: VehicleEventType,
        gps_status: GpsStatus,
    ) -> Self {
        Self {
            mdn: mdn.into(),
            event_timestamp_utc,
            event_type,
            gps_status,
            latitude: None,
            longitude: None,
            angle: None,
            speed: None,
            accumulated_distance_meters: None,
            battery_volt: None,
            on_time: None,
            ignition_off_time: None,
            geofence_group_id: None,
            geofence_point_id: None,
            event_value: None,
            raw_payload: None,
        }
    }

    /// Set the reported coordinates
    pub fn with_position(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.mdn.clone(), self.event_timestamp_utc)
    }

    /// Replace the coordinates (position backfill)
    pub fn adjust_gps_position(&mut self, latitude: Option<f64>, longitude: Option<f64>) {
        self.latitude = latitude;
        self.longitude = longitude;
    }

    /// Check the per-family field invariant.
    ///
    /// Ignition events carry exactly one of `onTime`/`ignitionOffTime`, and the
    /// one they carry matches the event type. Every other type carries neither.
    /// Geofence-only fields appear only on geofence events.
    pub fn has_consistent_shape(&self) -> bool {
        let ignition_ok = match self.event_type {
            VehicleEventType::IgnitionOn => {
                self.on_time.is_some() && self.ignition_off_time.is_none()
            }
            VehicleEventType::IgnitionOff => {
                self.on_time.is_none() && self.ignition_off_time.is_some()
            }
            _ => self.on_time.is_none() && self.ignition_off_time.is_none(),
        };

        let geofence_ok = self.event_type.is_geofence()
            || (self.geofence_group_id.is_none()
                && self.geofence_point_id.is_none()
                && self.event_value.is_none());

        ignition_ok && geofence_ok
    }
}
