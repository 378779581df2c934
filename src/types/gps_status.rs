//! GPS receiver status codes reported by terminals

use std::fmt;

use serde::{Deserialize, Serialize};

/// GPS status as carried in the `gcd` field.
///
/// Each variant maps to a single-character code that is used both on the
/// wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpsStatus {
    /// `A` - receiver has a valid fix
    #[serde(rename = "A")]
    Normal,
    /// `V` - receiver is present but has no valid fix
    #[serde(rename = "V")]
    Abnormal,
    /// `0` - no GPS receiver installed
    #[serde(rename = "0")]
    NotInstalled,
    /// `P` - no valid fix at ignition time; position should come from history
    #[serde(rename = "P")]
    AbnormalOnIgnition,
}

impl GpsStatus {
    pub fn code(&self) -> &'static str {
        match self {
            GpsStatus::Normal => "A",
            GpsStatus::Abnormal => "V",
            GpsStatus::NotInstalled => "0",
            GpsStatus::AbnormalOnIgnition => "P",
        }
    }

    /// Look up a status by its wire code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(GpsStatus::Normal),
            "V" => Some(GpsStatus::Abnormal),
            "0" => Some(GpsStatus::NotInstalled),
            "P" => Some(GpsStatus::AbnormalOnIgnition),
            _ => None,
        }
    }

    /// Degraded or missing receiver (`V` or `0`)
    pub fn is_degraded(&self) -> bool {
        matches!(self, GpsStatus::Abnormal | GpsStatus::NotInstalled)
    }
}

impl fmt::Display for GpsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_known_codes() {
        assert_eq!(GpsStatus::from_code("A"), Some(GpsStatus::Normal));
        assert_eq!(GpsStatus::from_code("V"), Some(GpsStatus::Abnormal));
        assert_eq!(GpsStatus::from_code("0"), Some(GpsStatus::NotInstalled));
        assert_eq!(GpsStatus::from_code("P"), Some(GpsStatus::AbnormalOnIgnition));
    }

    #[test]
    fn test_from_code_rejects_unknown() {
        assert_eq!(GpsStatus::from_code("a"), None);
        assert_eq!(GpsStatus::from_code(""), None);
        assert_eq!(GpsStatus::from_code("AV"), None);
    }

    #[test]
    fn test_serde_uses_wire_code() {
        assert_eq!(serde_json::to_string(&GpsStatus::NotInstalled).unwrap(), "\"0\"");
        let parsed: GpsStatus = serde_json::from_str("\"P\"").unwrap();
        assert_eq!(parsed, GpsStatus::AbnormalOnIgnition);
    }

    #[test]
    fn test_degraded() {
        assert!(GpsStatus::Abnormal.is_degraded());
        assert!(GpsStatus::NotInstalled.is_degraded());
        assert!(!GpsStatus::Normal.is_degraded());
        assert!(!GpsStatus::AbnormalOnIgnition.is_degraded());
    }
}
