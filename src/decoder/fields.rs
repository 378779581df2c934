//! Field contracts shared by every terminal payload

use std::str::FromStr;

use serde::Deserialize;

use crate::error::DecodeError;
use crate::types::GpsStatus;

/// Header values every terminal must send
pub const TERMINAL_ID: &str = "A001";
pub const MANUFACTURER_ID: &str = "6";
pub const PACKET_VERSION: &str = "5";
pub const DEVICE_ID: &str = "1";

/// Fields common to ignition and geofence payloads, as received
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFields {
    pub mdn: Option<String>,
    pub tid: Option<String>,
    pub mid: Option<String>,
    pub pv: Option<String>,
    pub did: Option<String>,
    pub gcd: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub ang: Option<String>,
    pub spd: Option<String>,
    pub sum: Option<String>,
    #[serde(rename = "batteryVolt")]
    pub battery_volt: Option<String>,
}

/// Common fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFields {
    pub mdn: String,
    pub gps_status: GpsStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub angle: u16,
    pub speed: u32,
    pub accumulated_distance: u64,
    pub battery_volt: Option<u32>,
}

/// Accumulates field errors so a payload reports all of them at once
#[derive(Debug, Default)]
pub(crate) struct FieldErrors {
    errors: Vec<DecodeError>,
}

impl FieldErrors {
    pub(crate) fn check<T>(&mut self, result: Result<T, DecodeError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    pub(crate) fn push(&mut self, err: DecodeError) {
        self.errors.push(err);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_inner(self) -> Vec<DecodeError> {
        self.errors
    }
}

impl ReportFields {
    /// The terminal identifier, if one was sent
    pub fn mdn(&self) -> Option<String> {
        self.mdn
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    /// Validate every common field, recording failures in `errors`
    pub(crate) fn decode(&self, errors: &mut FieldErrors) -> Option<DecodedFields> {
        let mdn = errors.check(required("mdn", self.mdn.as_deref()).map(str::to_string));

        errors.check(fixed("tid", self.tid.as_deref(), TERMINAL_ID));
        errors.check(fixed("mid", self.mid.as_deref(), MANUFACTURER_ID));
        errors.check(fixed("pv", self.pv.as_deref(), PACKET_VERSION));
        errors.check(fixed("did", self.did.as_deref(), DEVICE_ID));

        let gps_status = errors.check(gps_status(self.gcd.as_deref()));
        let latitude = errors.check(decimal("lat", self.lat.as_deref()));
        let longitude = errors.check(decimal("lon", self.lon.as_deref()));
        let angle = errors.check(unsigned::<u16>("ang", self.ang.as_deref()).and_then(|a| {
            if a < 360 {
                Ok(a)
            } else {
                Err(DecodeError::malformed("ang", "must be between 0 and 359"))
            }
        }));
        let speed = errors.check(unsigned::<u32>("spd", self.spd.as_deref()));
        let accumulated_distance = errors.check(unsigned::<u64>("sum", self.sum.as_deref()));
        let battery_volt = errors.check(optional_unsigned::<u32>(
            "batteryVolt",
            self.battery_volt.as_deref(),
        ));

        Some(DecodedFields {
            mdn: mdn?,
            gps_status: gps_status?,
            latitude: latitude?,
            longitude: longitude?,
            angle: angle?,
            speed: speed?,
            accumulated_distance: accumulated_distance?,
            battery_volt: battery_volt?,
        })
    }
}

/// Non-blank string
pub(crate) fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, DecodeError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DecodeError::malformed(field, "is required")),
    }
}

/// Header field that must equal a constant when present
fn fixed(field: &'static str, value: Option<&str>, expected: &str) -> Result<(), DecodeError> {
    match value {
        None => Ok(()),
        Some(v) if v == expected => Ok(()),
        Some(_) => Err(DecodeError::malformed(field, format!("must be '{}'", expected))),
    }
}

fn gps_status(value: Option<&str>) -> Result<GpsStatus, DecodeError> {
    let code = required("gcd", value)?;
    GpsStatus::from_code(code).ok_or_else(|| DecodeError::UnknownGpsCode(code.to_string()))
}

/// `-?\d+(\.\d+)?`
fn is_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}

fn decimal(field: &'static str, value: Option<&str>) -> Result<f64, DecodeError> {
    let value = required(field, value)?;
    if !is_decimal(value) {
        return Err(DecodeError::malformed(field, "must be a decimal number"));
    }
    value
        .parse::<f64>()
        .map_err(|_| DecodeError::malformed(field, "must be a decimal number"))
}

fn unsigned<T: FromStr>(field: &'static str, value: Option<&str>) -> Result<T, DecodeError> {
    let value = required(field, value)?;
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::malformed(field, "must be a non-negative integer"));
    }
    value
        .parse::<T>()
        .map_err(|_| DecodeError::malformed(field, "is out of range"))
}

/// Absent or empty means null, not zero
fn optional_unsigned<T: FromStr>(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<T>, DecodeError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => unsigned(field, Some(v)).map(Some),
    }
}
