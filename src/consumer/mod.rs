//! Event consumer
//!
//! Drains every channel partition concurrently. Within a partition records are
//! handled strictly one after another, so events of one terminal are processed
//! in publish order.
//!
//! Failure policy per record:
//! - store failures are retried up to `max_redeliveries` times with a fixed backoff
//! - anything else (unsupported type, business rule violation, handler panic)
//!   is not retried
//! - a record that still fails is reported to the [`ErrorSink`] and committed,
//!   so one bad record never blocks its partition

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::{Delivery, PartitionSubscription};
use crate::error::ProcessingError;
use crate::registry::HandlerRegistry;

/// Destination for records that could not be processed
pub trait ErrorSink: Send + Sync {
    fn report(&self, delivery: &Delivery, error: &ProcessingError);
}

/// Default sink: one structured log line per failed record
#[derive(Debug, Default)]
pub struct LoggingErrorSink;

impl ErrorSink for LoggingErrorSink {
    fn report(&self, delivery: &Delivery, error: &ProcessingError) {
        let record = &delivery.record;
        match error {
            ProcessingError::BusinessRuleViolation(violation) => warn!(
                mdn = %record.mdn,
                event_type = %record.event_type,
                partition = delivery.partition,
                offset = delivery.offset,
                code = violation.code,
                status = violation.status,
                "Event rejected: {}",
                violation.message
            ),
            other => error!(
                mdn = %record.mdn,
                event_type = %record.event_type,
                partition = delivery.partition,
                offset = delivery.offset,
                error = %other,
                "Event processing failed"
            ),
        }
    }
}

/// Keeps failed records in memory, e.g. for inspection in tests
#[derive(Default)]
pub struct CollectingErrorSink {
    failures: Mutex<Vec<(Delivery, String)>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed deliveries with their error messages, in report order
    pub fn failures(&self) -> Vec<(Delivery, String)> {
        self.failures.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, delivery: &Delivery, error: &ProcessingError) {
        self.failures.lock().push((delivery.clone(), error.to_string()));
    }
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Extra attempts for a retriable failure
    pub max_redeliveries: u32,
    pub redelivery_backoff: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_redeliveries: 3,
            redelivery_backoff: Duration::from_millis(200),
        }
    }
}

/// Totals for one consumer run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerReport {
    pub handled: u64,
    pub failed: u64,
}

impl std::ops::Add for ConsumerReport {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            handled: self.handled + other.handled,
            failed: self.failed + other.failed,
        }
    }
}

enum Outcome {
    Handled,
    Failed,
    /// Shutdown arrived mid-retry; leave the record uncommitted
    Interrupted,
}

pub struct EventConsumer {
    registry: Arc<HandlerRegistry>,
    sink: Arc<dyn ErrorSink>,
    config: ConsumerConfig,
}

impl EventConsumer {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        sink: Arc<dyn ErrorSink>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            registry,
            sink,
            config,
        }
    }

    /// Consume all partitions until cancelled or until every publisher is gone
    pub async fn run(
        &self,
        subscriptions: Vec<PartitionSubscription>,
        token: CancellationToken,
    ) -> ConsumerReport {
        info!(partitions = subscriptions.len(), "Starting event consumer");

        let reports = join_all(
            subscriptions
                .into_iter()
                .map(|sub| self.run_partition(sub, token.clone())),
        )
        .await;
        let report = reports.into_iter().fold(ConsumerReport::default(), |a, b| a + b);

        info!(
            handled = report.handled,
            failed = report.failed,
            "Event consumer stopped"
        );
        report
    }

    async fn run_partition(
        &self,
        mut sub: PartitionSubscription,
        token: CancellationToken,
    ) -> ConsumerReport {
        let partition = sub.partition();
        let mut report = ConsumerReport::default();

        loop {
            let delivery = tokio::select! {
                _ = token.cancelled() => {
                    debug!(partition, "Partition consumer cancelled");
                    break;
                }
                next = sub.next() => match next {
                    Some(delivery) => delivery,
                    None => {
                        debug!(partition, "Partition drained");
                        break;
                    }
                },
            };

            match self.process(&delivery, &token).await {
                Outcome::Handled => report.handled += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Interrupted => break,
            }

            if let Err(e) = sub.commit(delivery.offset) {
                // Not fatal: the record is handled again after a restart
                error!(partition, offset = delivery.offset, error = %e, "Failed to commit offset");
            }
        }

        report
    }

    async fn process(&self, delivery: &Delivery, token: &CancellationToken) -> Outcome {
        let mut attempt = 0u32;

        loop {
            let registry = self.registry.clone();
            let record = delivery.record.clone();
            let result = tokio::task::spawn_blocking(move || registry.dispatch(record)).await;

            let err = match result {
                Ok(Ok(())) => return Outcome::Handled,
                Ok(Err(err)) => err,
                Err(join_err) => {
                    let err = ProcessingError::HandlerPanicked(panic_message(join_err));
                    self.sink.report(delivery, &err);
                    return Outcome::Failed;
                }
            };

            if !err.is_retriable() || attempt >= self.config.max_redeliveries {
                self.sink.report(delivery, &err);
                return Outcome::Failed;
            }

            attempt += 1;
            warn!(
                mdn = %delivery.record.mdn,
                offset = delivery.offset,
                attempt,
                max = self.config.max_redeliveries,
                error = %err,
                "Retrying event"
            );

            tokio::select! {
                _ = token.cancelled() => return Outcome::Interrupted,
                _ = tokio::time::sleep(self.config.redelivery_backoff) => {}
            }
        }
    }
}

/// Best-effort text of a handler panic payload
fn panic_message(join_err: JoinError) -> String {
    if !join_err.is_panic() {
        return join_err.to_string();
    }
    let payload = join_err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelConfig, EventChannel};
    use crate::error::{ProcessingResult, StoreError};
    use crate::handlers::EventHandler;
    use crate::types::{EventRecord, GpsStatus, VehicleEventType};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a store error until `failures` attempts have been made
    struct Flaky {
        failures: u32,
        attempts: AtomicU32,
        handled: Mutex<Vec<EventRecord>>,
    }

    impl Flaky {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                attempts: AtomicU32::new(0),
                handled: Mutex::new(Vec::new()),
            })
        }
    }

    impl EventHandler for Flaky {
        fn event_type(&self) -> VehicleEventType {
            VehicleEventType::IgnitionOff
        }

        fn handle(&self, record: EventRecord) -> ProcessingResult<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(StoreError::Io(std::io::Error::other("disk unavailable")).into());
            }
            self.handled.lock().push(record);
            Ok(())
        }
    }

    /// Panics on every IGNITION_ON it is given
    struct Exploding;

    impl EventHandler for Exploding {
        fn event_type(&self) -> VehicleEventType {
            VehicleEventType::IgnitionOn
        }

        fn handle(&self, record: EventRecord) -> ProcessingResult<()> {
            panic!("corrupt record for {}", record.mdn);
        }
    }

    fn record(mdn: &str, second: u32, event_type: VehicleEventType) -> EventRecord {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, second).unwrap();
        let mut record = EventRecord::new(mdn, at, event_type, GpsStatus::Normal);
        match event_type {
            VehicleEventType::IgnitionOn => record.on_time = Some(at),
            VehicleEventType::IgnitionOff => record.ignition_off_time = Some(at),
            _ => {}
        }
        record
    }

    fn fast_config(max_redeliveries: u32) -> ConsumerConfig {
        ConsumerConfig {
            max_redeliveries,
            redelivery_backoff: Duration::from_millis(1),
        }
    }

    fn registry_with(handler: Arc<Flaky>) -> Arc<HandlerRegistry> {
        Arc::new(HandlerRegistry::builder().register(handler).unwrap().build())
    }

    #[tokio::test]
    async fn test_retriable_failure_is_redelivered() {
        let handler = Flaky::new(2);
        let sink = Arc::new(CollectingErrorSink::new());
        let consumer = EventConsumer::new(registry_with(handler.clone()), sink.clone(), fast_config(3));

        let (publisher, subs) = EventChannel::open(&ChannelConfig::in_memory(1)).unwrap();
        publisher
            .publish(record("010", 0, VehicleEventType::IgnitionOff))
            .await
            .unwrap();
        drop(publisher);

        let report = consumer.run(subs, CancellationToken::new()).await;

        assert_eq!(report, ConsumerReport { handled: 1, failed: 0 });
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_reported_and_skipped() {
        let handler = Flaky::new(u32::MAX);
        let sink = Arc::new(CollectingErrorSink::new());
        let consumer = EventConsumer::new(registry_with(handler.clone()), sink.clone(), fast_config(2));

        let (publisher, mut subs) = EventChannel::open(&ChannelConfig::in_memory(1)).unwrap();
        publisher
            .publish(record("010", 0, VehicleEventType::IgnitionOff))
            .await
            .unwrap();
        drop(publisher);

        let sub = subs.pop().unwrap();
        let report = consumer.run(vec![sub], CancellationToken::new()).await;

        assert_eq!(report, ConsumerReport { handled: 0, failed: 1 });
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(sink.len(), 1);
        assert!(sink.failures()[0].1.contains("disk unavailable"));
    }

    #[tokio::test]
    async fn test_unsupported_type_does_not_block_partition() {
        let handler = Flaky::new(0);
        let sink = Arc::new(CollectingErrorSink::new());
        let consumer = EventConsumer::new(registry_with(handler.clone()), sink.clone(), fast_config(3));

        let (publisher, subs) = EventChannel::open(&ChannelConfig::in_memory(1)).unwrap();
        publisher
            .publish(record("010", 0, VehicleEventType::Sos))
            .await
            .unwrap();
        publisher
            .publish(record("010", 1, VehicleEventType::IgnitionOff))
            .await
            .unwrap();
        drop(publisher);

        let report = consumer.run(subs, CancellationToken::new()).await;

        assert_eq!(report, ConsumerReport { handled: 1, failed: 1 });
        let failures = sink.failures();
        assert_eq!(failures[0].0.record.event_type, VehicleEventType::Sos);
        // Not retried
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(handler.handled.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_handler_panic_is_reported_and_partition_continues() {
        let handler = Flaky::new(0);
        let registry = HandlerRegistry::builder()
            .register(handler.clone())
            .unwrap()
            .register(Arc::new(Exploding))
            .unwrap()
            .build();
        let sink = Arc::new(CollectingErrorSink::new());
        let consumer = EventConsumer::new(Arc::new(registry), sink.clone(), fast_config(3));

        let (publisher, subs) = EventChannel::open(&ChannelConfig::in_memory(1)).unwrap();
        publisher
            .publish(record("010", 0, VehicleEventType::IgnitionOn))
            .await
            .unwrap();
        publisher
            .publish(record("010", 1, VehicleEventType::IgnitionOff))
            .await
            .unwrap();
        drop(publisher);

        let report = consumer.run(subs, CancellationToken::new()).await;

        assert_eq!(report, ConsumerReport { handled: 1, failed: 1 });
        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.record.event_type, VehicleEventType::IgnitionOn);
        assert_eq!(failures[0].1, "handler panicked: corrupt record for 010");
        assert_eq!(handler.handled.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_idle_consumer() {
        let consumer = EventConsumer::new(
            registry_with(Flaky::new(0)),
            Arc::new(LoggingErrorSink),
            ConsumerConfig::default(),
        );
        let (_publisher, subs) = EventChannel::open(&ChannelConfig::in_memory(2)).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let report = consumer.run(subs, token).await;
        assert_eq!(report, ConsumerReport::default());
    }
}
