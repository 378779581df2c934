//! Event store
//!
//! Keyed persistence for [`EventRecord`]s. Identity is `(mdn, eventTimestampUtc)`;
//! saving an existing key overwrites the stored record.
//!
//! - `EventStore`: the contract handlers depend on
//! - `EventLogStore`: in-memory index, optionally backed by an append-only JSONL file

mod event_log;

pub use event_log::EventLogStore;

use crate::error::StoreResult;
use crate::types::{EventKey, EventRecord, VehicleEventType};

/// Read/write contract used by the type handlers.
///
/// Implementations are shared between consumer tasks and must be thread-safe.
/// Calls may block on I/O.
pub trait EventStore: Send + Sync {
    /// Idempotent upsert keyed by `(mdn, eventTimestampUtc)`
    fn save(&self, record: EventRecord) -> StoreResult<()>;

    /// Most recent record of `event_type` for `mdn`, by event timestamp
    fn find_latest_by_key_and_type(
        &self,
        mdn: &str,
        event_type: VehicleEventType,
    ) -> StoreResult<Option<EventRecord>>;

    /// Number of stored records of `event_type` for `mdn`
    fn count_by_key_and_type(&self, mdn: &str, event_type: VehicleEventType) -> StoreResult<u64>;

    /// Exact lookup by identity
    fn get(&self, key: &EventKey) -> StoreResult<Option<EventRecord>>;

    /// Up to `limit` records for `mdn`, newest first
    fn find_by_key(&self, mdn: &str, limit: usize) -> StoreResult<Vec<EventRecord>>;
}
