//! Handlers with no rules beyond persistence

use std::sync::Arc;

use tracing::info;

use super::EventHandler;
use crate::error::ProcessingResult;
use crate::store::EventStore;
use crate::types::{EventRecord, VehicleEventType};

/// Stores records of one event type unchanged
pub struct PersistHandler {
    event_type: VehicleEventType,
    store: Arc<dyn EventStore>,
}

impl PersistHandler {
    pub fn new(event_type: VehicleEventType, store: Arc<dyn EventStore>) -> Self {
        Self { event_type, store }
    }

    pub fn ignition_off(store: Arc<dyn EventStore>) -> Self {
        Self::new(VehicleEventType::IgnitionOff, store)
    }

    pub fn geofence_in(store: Arc<dyn EventStore>) -> Self {
        Self::new(VehicleEventType::GeofenceIn, store)
    }

    pub fn geofence_out(store: Arc<dyn EventStore>) -> Self {
        Self::new(VehicleEventType::GeofenceOut, store)
    }
}

impl EventHandler for PersistHandler {
    fn event_type(&self) -> VehicleEventType {
        self.event_type
    }

    fn handle(&self, record: EventRecord) -> ProcessingResult<()> {
        let mdn = record.mdn.clone();
        self.store.save(record)?;
        info!(mdn = %mdn, event_type = %self.event_type, "Event saved");
        Ok(())
    }
}
