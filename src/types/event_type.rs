//! Vehicle event type tags

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of events a tracking terminal can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleEventType {
    /// Trip started
    CarStart,
    /// Trip finished
    CarStop,
    /// Entered a geofence
    GeofenceIn,
    /// Left a geofence
    GeofenceOut,
    /// Periodic position/state report
    PeriodicReport,
    /// Ignition switched on
    IgnitionOn,
    /// Ignition switched off
    IgnitionOff,
    /// Emergency call
    Sos,
    /// Battery below threshold
    BatteryLow,
}

impl VehicleEventType {
    /// All event types, in declaration order
    pub const ALL: [VehicleEventType; 9] = [
        VehicleEventType::CarStart,
        VehicleEventType::CarStop,
        VehicleEventType::GeofenceIn,
        VehicleEventType::GeofenceOut,
        VehicleEventType::PeriodicReport,
        VehicleEventType::IgnitionOn,
        VehicleEventType::IgnitionOff,
        VehicleEventType::Sos,
        VehicleEventType::BatteryLow,
    ];

    /// The tag as it appears on the wire and in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleEventType::CarStart => "CAR_START",
            VehicleEventType::CarStop => "CAR_STOP",
            VehicleEventType::GeofenceIn => "GEOFENCE_IN",
            VehicleEventType::GeofenceOut => "GEOFENCE_OUT",
            VehicleEventType::PeriodicReport => "PERIODIC_REPORT",
            VehicleEventType::IgnitionOn => "IGNITION_ON",
            VehicleEventType::IgnitionOff => "IGNITION_OFF",
            VehicleEventType::Sos => "SOS",
            VehicleEventType::BatteryLow => "BATTERY_LOW",
        }
    }

    pub fn is_geofence(&self) -> bool {
        matches!(self, VehicleEventType::GeofenceIn | VehicleEventType::GeofenceOut)
    }
}

impl fmt::Display for VehicleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
