//! Handler registry
//!
//! Maps each [`VehicleEventType`] to the single handler that owns it. The
//! registry is assembled once at startup and is read-only afterwards, so it can
//! be shared between consumer tasks behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ProcessingError, ProcessingResult, RegistryError};
use crate::handlers::EventHandler;
use crate::types::{EventRecord, VehicleEventType};

/// Collects handlers before the registry is frozen
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<VehicleEventType, Arc<dyn EventHandler>>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler under the type it reports.
    ///
    /// Fails if a handler for that type is already present.
    pub fn register(mut self, handler: Arc<dyn EventHandler>) -> Result<Self, RegistryError> {
        let event_type = handler.event_type();
        if self.handlers.contains_key(&event_type) {
            return Err(RegistryError::DuplicateHandler(event_type));
        }
        debug!(event_type = %event_type, "Registered handler");
        self.handlers.insert(event_type, handler);
        Ok(self)
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable event type to handler map
pub struct HandlerRegistry {
    handlers: HashMap<VehicleEventType, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    /// Route a record to the handler for its event type.
    ///
    /// Records whose optional fields do not match their event type are
    /// rejected before any handler sees them.
    pub fn dispatch(&self, record: EventRecord) -> ProcessingResult<()> {
        let Some(handler) = self.handlers.get(&record.event_type) else {
            warn!(
                mdn = %record.mdn,
                event_type = %record.event_type,
                "No handler registered for event type"
            );
            return Err(ProcessingError::UnsupportedEventType(record.event_type));
        };

        if !record.has_consistent_shape() {
            warn!(
                mdn = %record.mdn,
                event_type = %record.event_type,
                "Rejecting record with inconsistent fields"
            );
            return Err(ProcessingError::InconsistentShape(record.event_type));
        }

        handler.handle(record)
    }

    pub fn supports(&self, event_type: VehicleEventType) -> bool {
        self.handlers.contains_key(&event_type)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Registered event types in declaration order
    pub fn event_types(&self) -> Vec<VehicleEventType> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }
}
