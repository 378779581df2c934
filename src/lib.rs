//! Vehicle Event Pipeline
//!
//! Ingests ignition and geofence reports from vehicle tracking terminals,
//! normalizes them into [`EventRecord`]s and persists them through per-type
//! handlers that apply domain correction and validation rules.
//!
//! # Flow
//!
//! ```text
//! HTTP body ─► decoder ─► EventChannel ─► EventConsumer ─► HandlerRegistry ─► EventHandler ─► EventStore
//! ```
//!
//! # Modules
//!
//! - `decoder`: wire payloads to [`EventRecord`], with per-field validation
//! - `channel`: partitioned, optionally journaled queue (per-terminal order, at-least-once)
//! - `consumer`: drains the channel, retries transient failures
//! - `registry`: event type to handler lookup
//! - `handlers`: ignition-on GPS backfill and first-ignition check, plain persistence
//! - `store`: keyed event persistence (JSONL-backed)
//! - `api`: axum routes for ingestion and lookup
//! - `config`, `telemetry`: environment configuration and tracing setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vehicle_events::channel::{ChannelConfig, EventChannel};
//! use vehicle_events::consumer::{ConsumerConfig, EventConsumer, LoggingErrorSink};
//! use vehicle_events::handlers::register_all_handlers;
//! use vehicle_events::registry::HandlerRegistry;
//! use vehicle_events::store::EventLogStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(EventLogStore::open("data/events.jsonl")?);
//! let registry = register_all_handlers(HandlerRegistry::builder(), store.clone())?.build();
//! let (publisher, subscriptions) = EventChannel::open(&ChannelConfig::default())?;
//!
//! let consumer = EventConsumer::new(
//!     Arc::new(registry),
//!     Arc::new(LoggingErrorSink),
//!     ConsumerConfig::default(),
//! );
//! tokio::spawn(async move { consumer.run(subscriptions, CancellationToken::new()).await });
//! # drop(publisher);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod channel;
pub mod config;
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use channel::{ChannelConfig, Delivery, EventChannel, EventPublisher, PartitionSubscription};
pub use config::AppConfig;
pub use consumer::{ConsumerConfig, ErrorSink, EventConsumer, LoggingErrorSink};
pub use error::{
    BusinessRuleViolation, ChannelError, DecodeError, PayloadRejection, ProcessingError,
    RegistryError, StoreError,
};
pub use handlers::{register_all_handlers, EventHandler};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use store::{EventLogStore, EventStore};
pub use types::{EventKey, EventRecord, EventResponse, GpsStatus, VehicleEventType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
