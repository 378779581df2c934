//! Error types shared across the pipeline

use std::fmt;

use thiserror::Error;

use crate::types::VehicleEventType;

/// A single rejected field in an inbound payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{field}: {reason}")]
    MalformedPayload { field: &'static str, reason: String },

    #[error("gcd: unknown GPS status code '{0}'")]
    UnknownGpsCode(String),
}

impl DecodeError {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedPayload {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending payload field
    pub fn field(&self) -> &'static str {
        match self {
            DecodeError::MalformedPayload { field, .. } => field,
            DecodeError::UnknownGpsCode(_) => "gcd",
        }
    }
}

/// Every field-level problem found while decoding one payload
#[derive(Error, Debug, Clone, PartialEq)]
pub struct PayloadRejection {
    pub mdn: Option<String>,
    pub errors: Vec<DecodeError>,
}

impl PayloadRejection {
    /// Field messages in `field: reason` form
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field() == field)
    }
}

impl fmt::Display for PayloadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payload rejected: {}", self.messages().join("; "))
    }
}

/// Errors raised by an event store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Domain rejection raised by a type handler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code} ({status}): {message}")]
pub struct BusinessRuleViolation {
    /// Machine-readable code, e.g. `FIRST_IGNITION_SPEC_MISMATCH`
    pub code: &'static str,
    /// HTTP-style status class
    pub status: u16,
    pub message: String,
}

/// Failure while dispatching or handling one record
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("no handler registered for event type {0}")]
    UnsupportedEventType(VehicleEventType),

    #[error("business rule violation: {0}")]
    BusinessRuleViolation(#[from] BusinessRuleViolation),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0} record has fields that do not belong to its event type")]
    InconsistentShape(VehicleEventType),

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
}

impl ProcessingError {
    /// Whether redelivering the same record may succeed
    pub fn is_retriable(&self) -> bool {
        matches!(self, ProcessingError::Store(_))
    }
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;

/// Errors from building the handler registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler for {0} registered more than once")]
    DuplicateHandler(VehicleEventType),
}

/// Errors from the event channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("event channel is closed")]
    ChannelClosed,

    #[error("journal IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ChannelResult<T> = Result<T, ChannelError>;
