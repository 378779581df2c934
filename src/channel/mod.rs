//! Event channel
//!
//! Decouples HTTP ingestion from processing. Records are spread over a fixed
//! number of partitions by a stable hash of the terminal id (`mdn`), so every
//! record of one terminal lands on the same partition and is consumed in
//! publish order.
//!
//! ```text
//! publish(record)
//!     │  crc32(mdn) % partitions
//!     ▼
//! ┌─────────────┐   append    ┌───────────────────┐
//! │ partition n │ ──────────► │ partition-n.jsonl │  (optional journal)
//! └──────┬──────┘             └───────────────────┘
//!        │ mpsc
//!        ▼
//! PartitionSubscription::next() ─► handle ─► commit(offset) ─► partition-n.offset
//! ```
//!
//! Delivery is at-least-once: with a journal, anything published but not
//! committed is delivered again after a restart, even if the partition count
//! changed in between.

mod journal;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crc_any::CRCu32;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::error::{ChannelError, ChannelResult};
use crate::types::EventRecord;
use journal::{Journal, JournalEntry};

/// Channel sizing and durability settings
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Number of partitions, at least 1
    pub partitions: usize,
    /// In-flight records buffered per partition before `publish` waits
    pub capacity: usize,
    /// Directory for partition journals; `None` keeps the channel in memory
    pub journal_dir: Option<PathBuf>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            capacity: 1024,
            journal_dir: None,
        }
    }
}

impl ChannelConfig {
    pub fn in_memory(partitions: usize) -> Self {
        Self {
            partitions,
            ..Self::default()
        }
    }

    pub fn journaled(partitions: usize, dir: impl AsRef<Path>) -> Self {
        Self {
            partitions,
            journal_dir: Some(dir.as_ref().to_path_buf()),
            ..Self::default()
        }
    }
}

/// One record handed to a consumer
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub partition: usize,
    pub offset: u64,
    pub record: EventRecord,
}

/// Stable partition index for a terminal
pub fn partition_for(mdn: &str, partitions: usize) -> usize {
    let mut crc = CRCu32::crc32();
    crc.digest(mdn.as_bytes());
    (crc.get_crc() as usize) % partitions.max(1)
}

struct WriterState {
    next_offset: u64,
    journal: Option<Journal>,
}

struct PartitionWriter {
    index: usize,
    // Held across journal append and send so offsets reach the consumer in order
    state: Mutex<WriterState>,
    tx: mpsc::Sender<Delivery>,
}

/// Producer half of the channel; cheap to clone
#[derive(Clone)]
pub struct EventPublisher {
    partitions: Arc<Vec<PartitionWriter>>,
}

impl EventPublisher {
    /// Append `record` to its partition.
    ///
    /// Returns the partition and offset assigned to it. Fails with
    /// [`ChannelError::ChannelClosed`] once the partition's subscription is gone.
    pub async fn publish(&self, record: EventRecord) -> ChannelResult<(usize, u64)> {
        let index = partition_for(&record.mdn, self.partitions.len());
        let writer = &self.partitions[index];

        let mut state = writer.state.lock().await;
        if writer.tx.is_closed() {
            return Err(ChannelError::ChannelClosed);
        }

        let offset = state.next_offset;
        let entry = JournalEntry { offset, record };
        if let Some(journal) = state.journal.as_mut() {
            journal.append(&entry)?;
        }
        state.next_offset += 1;

        writer
            .tx
            .send(Delivery {
                partition: writer.index,
                offset,
                record: entry.record,
            })
            .await
            .map_err(|_| ChannelError::ChannelClosed)?;

        debug!(partition = writer.index, offset, "Published event");
        Ok((writer.index, offset))
    }
}

/// Consumer half for a single partition
pub struct PartitionSubscription {
    partition: usize,
    replay: VecDeque<Delivery>,
    rx: mpsc::Receiver<Delivery>,
    offset_path: Option<PathBuf>,
    committed: u64,
}

impl PartitionSubscription {
    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Next record in partition order.
    ///
    /// Recovered journal entries come first. Returns `None` once every
    /// publisher has been dropped and the partition is drained.
    pub async fn next(&mut self) -> Option<Delivery> {
        if let Some(delivery) = self.replay.pop_front() {
            return Some(delivery);
        }
        self.rx.recv().await
    }

    /// Mark `offset` and everything before it as processed
    pub fn commit(&mut self, offset: u64) -> ChannelResult<()> {
        let next = offset + 1;
        if next <= self.committed {
            return Ok(());
        }
        if let Some(path) = &self.offset_path {
            journal::write_committed(path, next)?;
        }
        self.committed = next;
        Ok(())
    }

    /// First offset not yet committed
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Recovered entries not yet handed out
    pub fn pending_replay(&self) -> usize {
        self.replay.len()
    }
}

/// Entry point for building a channel
pub struct EventChannel;

impl EventChannel {
    /// Create the partitions, recovering journaled records when configured
    pub fn open(
        config: &ChannelConfig,
    ) -> ChannelResult<(EventPublisher, Vec<PartitionSubscription>)> {
        let partitions = config.partitions.max(1);
        let capacity = config.capacity.max(1);

        let mut journals = match &config.journal_dir {
            Some(dir) => journal::open_all(dir, partitions)?.into_iter(),
            None => Vec::new().into_iter(),
        };
        let mut writers = Vec::with_capacity(partitions);
        let mut subscriptions = Vec::with_capacity(partitions);

        for index in 0..partitions {
            let (tx, rx) = mpsc::channel(capacity);

            let (journal, replay, next_offset, committed) = match journals.next() {
                Some((journal, recovered)) => {
                    let committed = recovered.committed();
                    let replay: VecDeque<Delivery> = recovered
                        .pending
                        .into_iter()
                        .map(|entry| Delivery {
                            partition: index,
                            offset: entry.offset,
                            record: entry.record,
                        })
                        .collect();
                    (Some(journal), replay, recovered.next_offset, committed)
                }
                None => (None, VecDeque::new(), 0, 0),
            };

            let offset_path = journal.as_ref().map(|j| j.offset_path().to_path_buf());

            writers.push(PartitionWriter {
                index,
                state: Mutex::new(WriterState {
                    next_offset,
                    journal,
                }),
                tx,
            });
            subscriptions.push(PartitionSubscription {
                partition: index,
                replay,
                rx,
                offset_path,
                committed,
            });
        }

        info!(
            partitions,
            capacity,
            journaled = config.journal_dir.is_some(),
            "Opened event channel"
        );

        Ok((
            EventPublisher {
                partitions: Arc::new(writers),
            },
            subscriptions,
        ))
    }
}
