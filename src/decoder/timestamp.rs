//! `ccyyMMddHHmmss` timestamps

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::error::DecodeError;

/// Length of a wire timestamp
pub const WIRE_TIMESTAMP_LEN: usize = 14;

const WIRE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parse a 14-digit `ccyyMMddHHmmss` value as a UTC instant
pub fn parse_wire_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, DecodeError> {
    if value.len() != WIRE_TIMESTAMP_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::malformed(
            field,
            "must be a 14-digit 'ccyyMMddHHmmss' timestamp",
        ));
    }

    let naive = NaiveDateTime::parse_from_str(value, WIRE_TIMESTAMP_FORMAT)
        .map_err(|_| DecodeError::malformed(field, "is not a valid calendar date/time"))?;
    // chrono reads second 60 as a leap second; terminals never send one
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(DecodeError::malformed(field, "is not a valid calendar date/time"));
    }
    Ok(naive.and_utc())
}

/// Render an instant back into the wire form
pub fn format_wire_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(WIRE_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_parse_valid_timestamp() {
        let parsed = parse_wire_timestamp("onTime", "20250301093015").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 15).unwrap());
    }

    #[test]
    fn test_round_trip_over_a_spread_of_instants() {
        let samples = [
            "19991231235959",
            "20000229000000",
            "20240229120000",
            "20251018081500",
            "20991231000001",
        ];
        for sample in samples {
            let parsed = parse_wire_timestamp("eventTime", sample).unwrap();
            assert_eq!(format_wire_timestamp(&parsed), sample);
        }
    }

    #[test]
    fn test_rejects_wrong_length_or_non_digits() {
        for bad in ["2025030109301", "202503010930150", "2025-03-01 09:", "20250301O93015", ""] {
            let err = parse_wire_timestamp("onTime", bad).unwrap_err();
            assert_eq!(err.field(), "onTime");
        }
    }

    #[test]
    fn test_rejects_impossible_calendar_values() {
        for bad in ["20250230120000", "20251301120000", "20250301246000", "20250301235960"] {
            assert!(parse_wire_timestamp("offTime", bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_leap_day() {
        let parsed = parse_wire_timestamp("eventTime", "20240229235959").unwrap();
        assert_eq!(parsed.month(), 2);
        assert_eq!(parsed.day(), 29);
        assert_eq!(parsed.second(), 59);
    }
}
