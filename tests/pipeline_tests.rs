//! End-to-end tests: decode, publish, consume, persist

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use vehicle_events::consumer::CollectingErrorSink;
use vehicle_events::decoder::{GeofencePayload, IgnitionPayload};
use vehicle_events::{
    register_all_handlers, ChannelConfig, ConsumerConfig, EventChannel, EventConsumer, EventKey,
    EventLogStore, EventRecord, EventStore, GpsStatus, HandlerRegistry, ProcessingError,
    VehicleEventType,
};

const MDN: &str = "01012345678";

fn ignition(on_time: &str, off_time: &str, gcd: &str, lat: &str, lon: &str) -> EventRecord {
    let payload: IgnitionPayload = serde_json::from_value(json!({
        "mdn": MDN,
        "tid": "A001",
        "mid": "6",
        "pv": "5",
        "did": "1",
        "onTime": on_time,
        "offTime": off_time,
        "gcd": gcd,
        "lat": lat,
        "lon": lon,
        "ang": "180",
        "spd": "0",
        "sum": "52000",
        "batteryVolt": "124"
    }))
    .unwrap();
    payload.decode(None).unwrap()
}

fn geofence_in(event_time: &str) -> EventRecord {
    let payload: GeofencePayload = serde_json::from_value(json!({
        "mdn": MDN,
        "eventTime": event_time,
        "gcd": "A",
        "lat": "37.4979",
        "lon": "127.0276",
        "ang": "45",
        "spd": "30",
        "sum": "52100",
        "geofenceGroupId": "HQ",
        "geofencePointId": "GATE-1",
        "eventValue": "IN"
    }))
    .unwrap();
    payload
        .decode(VehicleEventType::GeofenceIn, None)
        .unwrap()
}

fn consumer_for(store: Arc<EventLogStore>, sink: Arc<CollectingErrorSink>) -> EventConsumer {
    let registry = register_all_handlers(HandlerRegistry::builder(), store)
        .unwrap()
        .build();
    EventConsumer::new(
        Arc::new(registry),
        sink,
        ConsumerConfig {
            max_redeliveries: 1,
            redelivery_backoff: Duration::from_millis(1),
        },
    )
}

#[tokio::test]
async fn test_trip_sequence_backfills_ignition_on() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(EventLogStore::open(temp_dir.path().join("events.jsonl")).unwrap());
    let sink = Arc::new(CollectingErrorSink::new());
    let consumer = consumer_for(store.clone(), sink.clone());
    let (publisher, subs) = EventChannel::open(&ChannelConfig::in_memory(4)).unwrap();

    // First ignition of a new terminal, then a trip, then a cold start without a fix
    publisher
        .publish(ignition("20250301070000", "", "V", "0", "0"))
        .await
        .unwrap();
    publisher
        .publish(geofence_in("20250301073000"))
        .await
        .unwrap();
    publisher
        .publish(ignition("", "20250301080000", "A", "37.56", "126.97"))
        .await
        .unwrap();
    publisher
        .publish(ignition("20250301090000", "", "P", "0", "0"))
        .await
        .unwrap();
    drop(publisher);

    let report = consumer.run(subs, CancellationToken::new()).await;
    assert_eq!(report.handled, 4);
    assert!(sink.is_empty());

    let on = store
        .get(&EventKey::new(MDN, Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(on.event_type, VehicleEventType::IgnitionOn);
    assert_eq!(on.gps_status, GpsStatus::AbnormalOnIgnition);
    assert_eq!(on.latitude, Some(37.56));
    assert_eq!(on.longitude, Some(126.97));
    assert_eq!(on.battery_volt, Some(124));

    // Everything survives a reopen of the store
    drop(consumer);
    let reopened = EventLogStore::open(temp_dir.path().join("events.jsonl")).unwrap();
    assert_eq!(reopened.len(), 4);
    assert_eq!(
        reopened
            .count_by_key_and_type(MDN, VehicleEventType::IgnitionOn)
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_rejected_first_ignition_does_not_block_later_events() {
    let store = Arc::new(EventLogStore::in_memory());
    let sink = Arc::new(CollectingErrorSink::new());
    let consumer = consumer_for(store.clone(), sink.clone());
    let (publisher, subs) = EventChannel::open(&ChannelConfig::in_memory(2)).unwrap();

    publisher
        .publish(ignition("20250301070000", "", "A", "37.5", "127.0"))
        .await
        .unwrap();
    publisher
        .publish(ignition("", "20250301080000", "A", "37.56", "126.97"))
        .await
        .unwrap();
    drop(publisher);

    let report = consumer.run(subs, CancellationToken::new()).await;
    assert_eq!(report.handled, 1);
    assert_eq!(report.failed, 1);

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].1.contains("FIRST_IGNITION_SPEC_MISMATCH"));
    assert_eq!(store.len(), 1);
    assert_eq!(
        store
            .count_by_key_and_type(MDN, VehicleEventType::IgnitionOn)
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_journaled_events_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = ChannelConfig::journaled(2, temp_dir.path().join("channel"));
    let store = Arc::new(EventLogStore::in_memory());

    // Accepted but never consumed
    {
        let (publisher, _subs) = EventChannel::open(&config).unwrap();
        publisher
            .publish(ignition("20250301070000", "", "0", "0", "0"))
            .await
            .unwrap();
        publisher
            .publish(ignition("", "20250301080000", "A", "35.1", "129.0"))
            .await
            .unwrap();
    }

    let sink = Arc::new(CollectingErrorSink::new());
    let (publisher, subs) = EventChannel::open(&config).unwrap();
    drop(publisher);
    let report = consumer_for(store.clone(), sink.clone())
        .run(subs, CancellationToken::new())
        .await;

    assert_eq!(report.handled, 2);
    assert_eq!(store.len(), 2);

    // Committed now, so a further restart replays nothing
    let (_publisher, subs) = EventChannel::open(&config).unwrap();
    assert!(subs.iter().all(|s| s.pending_replay() == 0));
}

#[tokio::test]
async fn test_redelivered_records_are_idempotent() {
    let store = Arc::new(EventLogStore::in_memory());
    let sink = Arc::new(CollectingErrorSink::new());
    let consumer = consumer_for(store.clone(), sink.clone());
    let (publisher, subs) = EventChannel::open(&ChannelConfig::in_memory(1)).unwrap();

    let first_on = ignition("20250301070000", "", "V", "0", "0");
    publisher.publish(first_on.clone()).await.unwrap();
    publisher.publish(first_on).await.unwrap();
    drop(publisher);

    let report = consumer.run(subs, CancellationToken::new()).await;
    assert_eq!(report.handled, 2);
    assert!(sink.is_empty());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_unsupported_type_leaves_store_untouched() {
    let store = Arc::new(EventLogStore::in_memory());
    let registry = register_all_handlers(HandlerRegistry::builder(), store.clone())
        .unwrap()
        .build();

    let report = EventRecord::new(
        MDN,
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        VehicleEventType::PeriodicReport,
        GpsStatus::Normal,
    );
    let err = registry.dispatch(report).unwrap_err();

    assert!(matches!(
        err,
        ProcessingError::UnsupportedEventType(VehicleEventType::PeriodicReport)
    ));
    assert!(store.is_empty());
}
