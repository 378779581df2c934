//! Ignition on/off payloads

use serde::Deserialize;

use super::fields::{FieldErrors, ReportFields};
use super::timestamp::parse_wire_timestamp;
use crate::error::{DecodeError, PayloadRejection};
use crate::types::{EventRecord, VehicleEventType};

/// Ignition report as sent by a terminal.
///
/// Exactly one of `onTime`/`offTime` is non-empty; that one decides the event
/// type and becomes the event timestamp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IgnitionPayload {
    #[serde(flatten)]
    pub fields: ReportFields,
    #[serde(rename = "onTime")]
    pub on_time: Option<String>,
    #[serde(rename = "offTime")]
    pub off_time: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl IgnitionPayload {
    /// Decode into an `IGNITION_ON` or `IGNITION_OFF` record
    pub fn decode(&self, raw_payload: Option<String>) -> Result<EventRecord, PayloadRejection> {
        let mut errors = FieldErrors::default();
        let common = self.fields.decode(&mut errors);

        let timing = match (non_empty(&self.on_time), non_empty(&self.off_time)) {
            (Some(on), None) => errors
                .check(parse_wire_timestamp("onTime", on))
                .map(|ts| (VehicleEventType::IgnitionOn, ts)),
            (None, Some(off)) => errors
                .check(parse_wire_timestamp("offTime", off))
                .map(|ts| (VehicleEventType::IgnitionOff, ts)),
            (Some(_), Some(_)) => {
                errors.push(DecodeError::malformed(
                    "offTime",
                    "must be empty when onTime is set",
                ));
                None
            }
            (None, None) => {
                errors.push(DecodeError::malformed(
                    "onTime",
                    "one of onTime or offTime is required",
                ));
                None
            }
        };

        let (common, (event_type, timestamp)) = match (common, timing) {
            (Some(common), Some(timing)) if errors.is_empty() => (common, timing),
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
        match event_type {
            VehicleEventType::IgnitionOn => record.on_time = Some(timestamp),
            _ => record.ignition_off_time = Some(timestamp),
        }
        record.raw_payload = raw_payload;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::format_wire_timestamp;
    use crate::types::GpsStatus;

    fn payload(on: &str, off: &str) -> IgnitionPayload {
        let json = serde_json::json!({
            "mdn": "01012345678",
            "tid": "A001",
            "mid": "6",
            "pv": "5",
            "did": "1",
            "onTime": on,
            "offTime": off,
            "gcd": "A",
            "lat": "37.5665",
            "lon": "126.9780",
            "ang": "120",
            "spd": "0",
            "sum": "5000",
            "batteryVolt": "124"
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_on_time_decodes_to_ignition_on() {
        let record = payload("20250301093000", "").decode(None).unwrap();

        assert_eq!(record.event_type, VehicleEventType::IgnitionOn);
        assert_eq!(format_wire_timestamp(&record.event_timestamp_utc), "20250301093000");
        assert_eq!(record.on_time, Some(record.event_timestamp_utc));
        assert_eq!(record.ignition_off_time, None);
        assert_eq!(record.gps_status, GpsStatus::Normal);
        assert_eq!(record.battery_volt, Some(124));
        assert!(record.has_consistent_shape());
    }

    #[test]
    fn test_off_time_decodes_to_ignition_off() {
        let record = payload("", "20250301180000").decode(None).unwrap();

        assert_eq!(record.event_type, VehicleEventType::IgnitionOff);
        assert_eq!(record.ignition_off_time, Some(record.event_timestamp_utc));
        assert_eq!(record.on_time, None);
        assert!(record.has_consistent_shape());
    }

    #[test]
    fn test_both_times_is_malformed() {
        let rejection = payload("20250301093000", "20250301180000")
            .decode(None)
            .unwrap_err();

        assert!(matches!(
            rejection.errors.as_slice(),
            [DecodeError::MalformedPayload { field: "offTime", .. }]
        ));
        assert_eq!(rejection.mdn.as_deref(), Some("01012345678"));
    }

    #[test]
    fn test_neither_time_is_malformed() {
        let rejection = payload("", "").decode(None).unwrap_err();
        assert!(rejection.has_field("onTime"));
    }

    #[test]
    fn test_missing_off_time_key_counts_as_empty() {
        let mut p = payload("20250301093000", "");
        p.off_time = None;
        assert_eq!(p.decode(None).unwrap().event_type, VehicleEventType::IgnitionOn);
    }

    #[test]
    fn test_unknown_gcd_fails_with_unknown_gps_code() {
        let mut p = payload("20250301093000", "");
        p.fields.gcd = Some("Q".to_string());

        let rejection = p.decode(None).unwrap_err();
        assert!(rejection
            .errors
            .contains(&DecodeError::UnknownGpsCode("Q".to_string())));
    }

    #[test]
    fn test_raw_payload_retained() {
        let record = payload("20250301093000", "")
            .decode(Some("{\"mdn\":\"01012345678\"}".to_string()))
            .unwrap();
        assert_eq!(record.raw_payload.as_deref(), Some("{\"mdn\":\"01012345678\"}"));
    }
}
