//! JSONL-backed event store
//!
//! Every save appends one JSON line to the log file and updates an ordered
//! in-memory index. On open the log is replayed; the last line for a key wins,
//! which gives upsert semantics without rewriting the file on every write.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::EventStore;
use crate::error::StoreResult;
use crate::types::{EventKey, EventRecord, VehicleEventType};
use crate::utils::{atomic_write_with, cleanup_temp_files};

/// Event store with an ordered in-memory index and optional append-only file
pub struct EventLogStore {
    file_path: Option<PathBuf>,
    records: RwLock<BTreeMap<EventKey, EventRecord>>,
    log: Option<Mutex<File>>,
}

impl EventLogStore {
    /// Create a store that keeps records in memory only
    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            records: RwLock::new(BTreeMap::new()),
            log: None,
        }
    }

    /// Open (or create) a store backed by the JSONL file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            cleanup_temp_files(parent)?;
        }

        let (records, torn) = Self::load_from_file(&path)?;
        if torn {
            // Appending after a partial line would glue the next record onto it
            write_records(&path, &records)?;
            warn!(
                path = %path.display(),
                records = records.len(),
                "Rewrote event store log without its unreadable lines"
            );
        }
        let log = OpenOptions::new().create(true).append(true).open(&path)?;

        info!(
            path = %path.display(),
            records = records.len(),
            "Opened event store"
        );

        Ok(Self {
            file_path: Some(path),
            records: RwLock::new(records),
            log: Some(Mutex::new(log)),
        })
    }

    /// Replay the log. The flag is set when the file needs rewriting before
    /// further appends: a line was skipped or the file does not end in `\n`.
    fn load_from_file(path: &Path) -> StoreResult<(BTreeMap<EventKey, EventRecord>, bool)> {
        let mut records = BTreeMap::new();
        if !path.exists() {
            return Ok((records, false));
        }

        let mut skipped = 0usize;
        let reader = BufReader::new(File::open(path)?);
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<EventRecord>(&line) {
                Ok(record) => {
                    records.insert(record.key(), record);
                }
                Err(e) => {
                    // A torn last line after a crash is expected; keep going
                    skipped += 1;
                    warn!(
                        path = %path.display(),
                        line = line_num + 1,
                        error = %e,
                        "Skipping unreadable event store line"
                    );
                }
            }
        }

        let torn = skipped > 0 || !ends_with_newline(path)?;
        Ok((records, torn))
    }

    /// Rewrite the log so it holds exactly one line per stored key.
    ///
    /// Returns the number of lines written. No-op for in-memory stores.
    pub fn compact(&self) -> StoreResult<usize> {
        let (Some(path), Some(log)) = (&self.file_path, &self.log) else {
            return Ok(0);
        };

        let records = self.records.write();
        let mut file = log.lock();

        write_records(path, &records)?;
        *file = OpenOptions::new().append(true).open(path)?;

        debug!(path = %path.display(), lines = records.len(), "Compacted event store");
        Ok(records.len())
    }

    /// Number of distinct stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for EventLogStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Atomically replace the log with one line per record
fn write_records(path: &Path, records: &BTreeMap<EventKey, EventRecord>) -> StoreResult<()> {
    atomic_write_with(path, |out| {
        for record in records.values() {
            let line = serde_json::to_string(record)?;
            writeln!(out, "{}", line)?;
        }
        Ok(())
    })?;
    Ok(())
}

fn ends_with_newline(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// All records of one terminal, oldest first
fn terminal_records<'a>(
    records: &'a BTreeMap<EventKey, EventRecord>,
    mdn: &str,
) -> impl DoubleEndedIterator<Item = &'a EventRecord> {
    let start = EventKey::new(mdn, DateTime::<Utc>::MIN_UTC);
    let end = EventKey::new(mdn, DateTime::<Utc>::MAX_UTC);
    records.range(start..=end).map(|(_, record)| record)
}

impl EventStore for EventLogStore {
    fn save(&self, record: EventRecord) -> StoreResult<()> {
        let mut records = self.records.write();

        if let Some(log) = &self.log {
            let line = serde_json::to_string(&record)?;
            let mut file = log.lock();
            writeln!(file, "{}", line)?;
            file.flush()?;
        }

        let key = record.key();
        if records.insert(key.clone(), record).is_some() {
            debug!(mdn = %key.mdn, ts = %key.event_timestamp_utc, "Overwrote existing event");
        }
        Ok(())
    }

    fn find_latest_by_key_and_type(
        &self,
        mdn: &str,
        event_type: VehicleEventType,
    ) -> StoreResult<Option<EventRecord>> {
        let records = self.records.read();
        let latest = terminal_records(&records, mdn)
            .rev()
            .find(|r| r.event_type == event_type)
            .cloned();
        Ok(latest)
    }

    fn count_by_key_and_type(&self, mdn: &str, event_type: VehicleEventType) -> StoreResult<u64> {
        let records = self.records.read();
        let count = terminal_records(&records, mdn)
            .filter(|r| r.event_type == event_type)
            .count();
        Ok(count as u64)
    }

    fn get(&self, key: &EventKey) -> StoreResult<Option<EventRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn find_by_key(&self, mdn: &str, limit: usize) -> StoreResult<Vec<EventRecord>> {
        let records = self.records.read();
        let recent: Vec<EventRecord> = terminal_records(&records, mdn)
            .rev()
            .take(limit)
            .cloned()
            .collect();
        Ok(recent)
    }
}
