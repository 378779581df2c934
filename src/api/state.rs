//! Shared HTTP application state

use std::sync::Arc;

use crate::channel::EventPublisher;
use crate::store::EventStore;

/// Handles every request handler needs
pub struct AppState {
    /// Producer side of the event channel
    pub publisher: EventPublisher,
    /// Read access for the query endpoint
    pub store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(publisher: EventPublisher, store: Arc<dyn EventStore>) -> Self {
        Self { publisher, store }
    }
}
