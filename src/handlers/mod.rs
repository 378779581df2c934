//! Type handlers
//!
//! One handler per event type. A handler applies the type's correction and
//! validation rules and then persists the record.
//!
//! - `IgnitionOnHandler`: GPS backfill from the last ignition-off, first-ignition check
//! - `PersistHandler`: store as-is (ignition-off, geofence in/out)

mod ignition_on;
mod persist;

use std::sync::Arc;

pub use ignition_on::{IgnitionOnHandler, FIRST_IGNITION_SPEC_MISMATCH};
pub use persist::PersistHandler;

use crate::error::{ProcessingResult, RegistryError};
use crate::registry::HandlerRegistryBuilder;
use crate::store::EventStore;
use crate::types::{EventRecord, VehicleEventType};

/// Trait for type handlers
///
/// All handlers must implement this trait to be registered with the
/// [`HandlerRegistry`](crate::registry::HandlerRegistry). `handle` may run more
/// than once for the same record (at-least-once delivery), so it has to be
/// idempotent.
pub trait EventHandler: Send + Sync {
    /// The event type this handler owns
    fn event_type(&self) -> VehicleEventType;

    /// Validate, correct and persist one record
    fn handle(&self, record: EventRecord) -> ProcessingResult<()>;
}

/// Register every handler this crate ships
pub fn register_all_handlers(
    builder: HandlerRegistryBuilder,
    store: Arc<dyn EventStore>,
) -> Result<HandlerRegistryBuilder, RegistryError> {
    builder
        .register(Arc::new(IgnitionOnHandler::new(store.clone())))?
        .register(Arc::new(PersistHandler::ignition_off(store.clone())))?
        .register(Arc::new(PersistHandler::geofence_in(store.clone())))?
        .register(Arc::new(PersistHandler::geofence_out(store)))
}
