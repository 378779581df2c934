//! Ignition-on handler
//!
//! Terminals that cannot get a fix at ignition report `gcd = P` and expect the
//! server to reuse the position recorded at the last ignition-off. A freshly
//! installed terminal has no such history, so its first ignition must arrive
//! with a degraded GPS status (`V` or `0`) and zero coordinates.

use std::sync::Arc;

use tracing::{info, warn};

use super::EventHandler;
use crate::error::{BusinessRuleViolation, ProcessingResult};
use crate::store::EventStore;
use crate::types::{EventRecord, GpsStatus, VehicleEventType};

/// Code raised when a terminal's first ignition carries a normal GPS fix
pub const FIRST_IGNITION_SPEC_MISMATCH: &str = "FIRST_IGNITION_SPEC_MISMATCH";

pub struct IgnitionOnHandler {
    store: Arc<dyn EventStore>,
}

impl IgnitionOnHandler {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Replace the position with the one stored at the last ignition-off,
    /// or `(0, 0)` when the terminal has never switched off.
    fn backfill_position(&self, record: &mut EventRecord) -> ProcessingResult<()> {
        let last_off = self
            .store
            .find_latest_by_key_and_type(&record.mdn, VehicleEventType::IgnitionOff)?;

        match last_off {
            Some(off) => {
                info!(
                    mdn = %record.mdn,
                    off_at = %off.event_timestamp_utc,
                    latitude = ?off.latitude,
                    longitude = ?off.longitude,
                    "Backfilled ignition-on position from last ignition-off"
                );
                record.adjust_gps_position(off.latitude, off.longitude);
            }
            None => {
                info!(
                    mdn = %record.mdn,
                    "No ignition-off on record, using (0, 0) for ignition-on position"
                );
                record.adjust_gps_position(Some(0.0), Some(0.0));
            }
        }
        Ok(())
    }

    /// Whether no earlier ignition-on exists for this terminal.
    ///
    /// A redelivered record that was already stored does not count itself.
    fn is_first_on(&self, record: &EventRecord) -> ProcessingResult<bool> {
        let mut count = self
            .store
            .count_by_key_and_type(&record.mdn, VehicleEventType::IgnitionOn)?;

        let already_stored = self
            .store
            .get(&record.key())?
            .is_some_and(|stored| stored.event_type == VehicleEventType::IgnitionOn);
        if already_stored {
            count = count.saturating_sub(1);
        }

        Ok(count == 0)
    }
}

/// Degraded receiver and at least one zero (or missing) coordinate
fn is_abnormal_gps(record: &EventRecord) -> bool {
    let zero = |c: Option<f64>| c.unwrap_or(0.0) == 0.0;
    record.gps_status.is_degraded() && (zero(record.latitude) || zero(record.longitude))
}

impl EventHandler for IgnitionOnHandler {
    fn event_type(&self) -> VehicleEventType {
        VehicleEventType::IgnitionOn
    }

    fn handle(&self, mut record: EventRecord) -> ProcessingResult<()> {
        // Backfill runs before the first-ignition check, which sees the corrected record
        if record.gps_status == GpsStatus::AbnormalOnIgnition {
            self.backfill_position(&mut record)?;
        }

        let is_first_on = self.is_first_on(&record)?;
        if is_first_on && !is_abnormal_gps(&record) {
            warn!(
                mdn = %record.mdn,
                gps_status = %record.gps_status,
                "First ignition-on reported without a degraded GPS status"
            );
            return Err(BusinessRuleViolation {
                code: FIRST_IGNITION_SPEC_MISMATCH,
                status: 400,
                message: format!(
                    "first ignition of terminal {} must report GPS status V or 0 with no position, got {}",
                    record.mdn, record.gps_status
                ),
            }
            .into());
        }

        let mdn = record.mdn.clone();
        self.store.save(record)?;
        info!(mdn = %mdn, first_on = is_first_on, "Ignition-on event saved");
        Ok(())
    }
}
