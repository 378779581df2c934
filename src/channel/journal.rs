//! Per-partition journal files
//!
//! `partition-<n>.jsonl` holds one `{offset, record}` line per published event.
//! `partition-<n>.offset` holds the next offset the consumer has not committed.
//! Every append is synced to disk before `publish` returns.
//!
//! On open, entries at or past the committed offset are handed back for
//! redelivery and each journal is rewritten to hold only those. If the
//! partition count changed since the last run, all pending entries are routed
//! again with the new count. They are staged in `rebalance.jsonl` first, so a
//! crash while moving them can only cause duplicates.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::partition_for;
use crate::error::ChannelResult;
use crate::types::EventRecord;
use crate::utils::{atomic_write, atomic_write_with};

const STAGING_FILE: &str = "rebalance.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JournalEntry {
    pub offset: u64,
    pub record: EventRecord,
}

/// State recovered from disk for one partition
#[derive(Default)]
pub(crate) struct Recovered {
    pub pending: Vec<JournalEntry>,
    pub next_offset: u64,
}

impl Recovered {
    /// First offset still owed to the consumer
    pub fn committed(&self) -> u64 {
        self.pending.first().map_or(self.next_offset, |e| e.offset)
    }
}

pub(crate) struct Journal {
    offset_path: PathBuf,
    log: File,
}

/// Open the journals for partitions `0..partitions` under `dir`.
///
/// Returns one journal per partition, in order, with its uncommitted entries.
/// Journals of partitions beyond the configured count are drained into the
/// remaining ones and deleted.
pub(crate) fn open_all(dir: &Path, partitions: usize) -> ChannelResult<Vec<(Journal, Recovered)>> {
    fs::create_dir_all(dir)?;

    let staging_path = dir.join(STAGING_FILE);
    let staged: Vec<EventRecord> = read_lines(&staging_path)?;

    let mut indexes = partitions_on_disk(dir)?;
    indexes.extend(0..partitions);
    let mut recovered = BTreeMap::new();
    for index in indexes {
        recovered.insert(index, recover(dir, index)?);
    }

    let misrouted = !staged.is_empty()
        || recovered.iter().any(|(index, r)| {
            r.pending
                .iter()
                .any(|e| partition_for(&e.record.mdn, partitions) != *index)
        });

    if misrouted {
        // Oldest first: a terminal's entries all sit in one source, in order
        let mut records = staged;
        for r in recovered.values() {
            records.extend(r.pending.iter().map(|e| e.record.clone()));
        }
        write_lines(&staging_path, &records)?;

        let mut routed: Vec<Vec<EventRecord>> = vec![Vec::new(); partitions];
        let moved = records.len();
        for record in records {
            routed[partition_for(&record.mdn, partitions)].push(record);
        }
        for (index, records) in routed.into_iter().enumerate() {
            let base = recovered.get(&index).map_or(0, |r| r.next_offset);
            let pending: Vec<JournalEntry> = (base..)
                .zip(records)
                .map(|(offset, record)| JournalEntry { offset, record })
                .collect();
            let next_offset = base + pending.len() as u64;
            recovered.insert(
                index,
                Recovered {
                    pending,
                    next_offset,
                },
            );
        }
        warn!(
            dir = %dir.display(),
            partitions,
            records = moved,
            "Partition count changed, re-routed uncommitted journal entries"
        );
    }

    let mut journals = Vec::with_capacity(partitions);
    for index in 0..partitions {
        let state = recovered.remove(&index).unwrap_or_default();
        journals.push(Journal::create(dir, index, state)?);
    }

    for index in recovered.into_keys() {
        remove_if_exists(&log_path(dir, index))?;
        remove_if_exists(&offset_path(dir, index))?;
        info!(partition = index, "Removed journal of retired partition");
    }
    if misrouted {
        remove_if_exists(&staging_path)?;
    }

    Ok(journals)
}

impl Journal {
    /// Rewrite the partition's files to hold exactly `recovered` and open for append
    fn create(dir: &Path, partition: usize, recovered: Recovered) -> ChannelResult<(Self, Recovered)> {
        let log_path = log_path(dir, partition);
        let offset_path = offset_path(dir, partition);

        // Drop committed entries so the journal does not grow across restarts
        write_lines(&log_path, &recovered.pending)?;
        write_committed(&offset_path, recovered.committed())?;
        let log = OpenOptions::new().append(true).open(&log_path)?;

        if !recovered.pending.is_empty() {
            info!(
                partition,
                pending = recovered.pending.len(),
                committed = recovered.committed(),
                "Recovered uncommitted events from journal"
            );
        }

        Ok((Self { offset_path, log }, recovered))
    }

    pub fn append(&mut self, entry: &JournalEntry) -> ChannelResult<()> {
        let line = serde_json::to_string(entry)?;
        writeln!(self.log, "{}", line)?;
        self.log.sync_data()?;
        Ok(())
    }

    pub fn offset_path(&self) -> &Path {
        &self.offset_path
    }
}

/// Persist `next` as the first offset still owed to the consumer
pub(crate) fn write_committed(offset_path: &Path, next: u64) -> ChannelResult<()> {
    atomic_write(offset_path, &next.to_string())?;
    Ok(())
}

fn log_path(dir: &Path, partition: usize) -> PathBuf {
    dir.join(format!("partition-{}.jsonl", partition))
}

fn offset_path(dir: &Path, partition: usize) -> PathBuf {
    dir.join(format!("partition-{}.offset", partition))
}

/// Indexes of every `partition-<n>.jsonl` in `dir`
fn partitions_on_disk(dir: &Path) -> ChannelResult<BTreeSet<usize>> {
    let mut indexes = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let index = name
            .to_str()
            .and_then(|n| n.strip_prefix("partition-"))
            .and_then(|n| n.strip_suffix(".jsonl"))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(index) = index {
            indexes.insert(index);
        }
    }
    Ok(indexes)
}

/// Read one partition's uncommitted entries without touching its files
fn recover(dir: &Path, partition: usize) -> ChannelResult<Recovered> {
    let committed = read_committed(&offset_path(dir, partition))?;
    let entries: Vec<JournalEntry> = read_lines(&log_path(dir, partition))?;

    let mut next_offset = committed;
    let mut pending = Vec::new();
    for entry in entries {
        next_offset = next_offset.max(entry.offset + 1);
        if entry.offset >= committed {
            pending.push(entry);
        }
    }

    Ok(Recovered {
        pending,
        next_offset,
    })
}

/// Parse a JSONL file, skipping unreadable lines. A missing file reads as empty.
fn read_lines<T: DeserializeOwned>(path: &Path) -> ChannelResult<Vec<T>> {
    let mut items = Vec::new();
    if !path.exists() {
        return Ok(items);
    }

    let reader = BufReader::new(File::open(path)?);
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = line_num + 1,
                    error = %e,
                    "Skipping unreadable journal line"
                );
            }
        }
    }
    Ok(items)
}

fn write_lines<T: Serialize>(path: &Path, items: &[T]) -> ChannelResult<()> {
    atomic_write_with(path, |out| {
        for item in items {
            writeln!(out, "{}", serde_json::to_string(item)?)?;
        }
        Ok(())
    })?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn read_committed(offset_path: &Path) -> ChannelResult<u64> {
    if !offset_path.exists() {
        return Ok(0);
    }
    let content = fs::read_to_string(offset_path)?;
    match content.trim().parse::<u64>() {
        Ok(offset) => Ok(offset),
        Err(e) => {
            // Redeliver everything rather than skip events
            warn!(
                path = %offset_path.display(),
                error = %e,
                "Unreadable committed offset, replaying whole journal"
            );
            Ok(0)
        }
    }
}
