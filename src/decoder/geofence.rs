//! Geofence crossing payloads

use serde::Deserialize;

use super::fields::{required, FieldErrors, ReportFields};
use super::timestamp::parse_wire_timestamp;
use crate::error::{DecodeError, PayloadRejection};
use crate::types::{EventRecord, VehicleEventType};

/// Geofence report as sent by a terminal.
///
/// The wire format only carries an `IN`/`OUT` direction flag, so the caller
/// names the event type when decoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeofencePayload {
    #[serde(flatten)]
    pub fields: ReportFields,
    #[serde(rename = "eventTime")]
    pub event_time: Option<String>,
    #[serde(rename = "geofenceGroupId")]
    pub geofence_group_id: Option<String>,
    #[serde(rename = "geofencePointId")]
    pub geofence_point_id: Option<String>,
    #[serde(rename = "eventValue")]
    pub event_value: Option<String>,
}

impl GeofencePayload {
    /// Decode as `GEOFENCE_IN` or `GEOFENCE_OUT`
    pub fn decode(
        &self,
        event_type: VehicleEventType,
        raw_payload: Option<String>,
    ) -> Result<EventRecord, PayloadRejection> {
        let mut errors = FieldErrors::default();

        let expected_value = match event_type {
            VehicleEventType::GeofenceIn => Some("IN"),
            VehicleEventType::GeofenceOut => Some("OUT"),
            other => {
                errors.push(DecodeError::malformed(
                    "eventType",
                    format!("{} is not a geofence event", other),
                ));
                None
            }
        };

        let common = self.fields.decode(&mut errors);
        let timestamp = errors.check(
            required("eventTime", self.event_time.as_deref())
                .and_then(|v| parse_wire_timestamp("eventTime", v)),
        );
        let group_id = errors.check(required("geofenceGroupId", self.geofence_group_id.as_deref()));
        let point_id = errors.check(required("geofencePointId", self.geofence_point_id.as_deref()));
        let event_value = errors.check(required("eventValue", self.event_value.as_deref()).and_then(
            |v| match (v, expected_value) {
                ("IN" | "OUT", Some(expected)) if v != expected => Err(DecodeError::malformed(
                    "eventValue",
                    format!("'{}' does not match {}", v, event_type),
                )),
                ("IN" | "OUT", _) => Ok(v),
                _ => Err(DecodeError::malformed("eventValue", "must be 'IN' or 'OUT'")),
            },
        ));

        let (common, timestamp, group_id, point_id, event_value) =
            match (common, timestamp, group_id, point_id, event_value) {
                (Some(c), Some(t), Some(g), Some(p), Some(v)) if errors.is_empty() => (c, t, g, p, v),
                _ => {
                    return Err(PayloadRejection {
                        mdn: self.fields.mdn(),
                        errors: errors.into_inner(),
                    })
                }
            };

        let mut record = EventRecord::new(common.mdn, timestamp, event_type, common.gps_status)
            .with_position(common.latitude, common.longitude);
        record.angle = Some(common.angle);
        record.speed = Some(common.speed);
        record.accumulated_distance_meters = Some(common.accumulated_distance);
        record.battery_volt = common.battery_volt;
        record.geofence_group_id = Some(group_id.to_string());
        record.geofence_point_id = Some(point_id.to_string());
        record.event_value = Some(event_value.to_string());
        record.raw_payload = raw_payload;

        Ok(record)
    }
}
