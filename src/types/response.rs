//! Outbound result returned to terminals

use serde::{Deserialize, Serialize};

/// Result body for every ingestion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    /// `"200"`, `"400"` or `"500"`
    #[serde(rename = "rstCd")]
    pub result_code: String,
    #[serde(rename = "rstMsg")]
    pub result_message: String,
    pub mdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl EventResponse {
    pub fn ok(mdn: impl Into<String>) -> Self {
        Self {
            result_code: "200".to_string(),
            result_message: "OK".to_string(),
            mdn: Some(mdn.into()),
            errors: None,
        }
    }

    /// Validation failure with one message per offending field
    pub fn bad_request(mdn: Option<String>, errors: Vec<String>) -> Self {
        Self {
            result_code: "400".to_string(),
            result_message: "Request parameter validation failed".to_string(),
            mdn,
            errors: Some(errors),
        }
    }

    pub fn internal_error(mdn: Option<String>) -> Self {
        Self {
            result_code: "500".to_string(),
            result_message: "INTERNAL SERVER ERROR".to_string(),
            mdn,
            errors: None,
        }
    }
}
