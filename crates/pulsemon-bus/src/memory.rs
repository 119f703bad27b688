use crate::error::Result;
use crate::{MessageBus, OffsetReset, Record, RecordMeta, Subscription};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Partition count of every in-memory topic. Enough to exercise key
/// routing without fanning tests out too widely.
const PARTITIONS: i32 = 4;

#[derive(Clone)]
struct StoredRecord {
    key: Option<String>,
    payload: Vec<u8>,
}

struct TopicLog {
    partitions: Vec<Vec<StoredRecord>>,
}

impl TopicLog {
    fn new() -> Self {
        Self {
            partitions: (0..PARTITIONS).map(|_| Vec::new()).collect(),
        }
    }
}

#[derive(Default)]
struct Inner {
    topics: HashMap<String, TopicLog>,
    /// (group, topic, partition) -> next offset to deliver after a
    /// re-subscribe. Only advanced by explicit acks.
    committed: HashMap<(String, String, i32), i64>,
}

/// In-memory message bus with the same contract as the Kafka one:
/// key-hashed partitions, per-partition ordering, consumer-group offsets
/// advanced only by acknowledgement, and latest/earliest offset reset.
///
/// Used in development when no broker is reachable and throughout the test
/// suites. A group is assumed to have a single live subscription per
/// topic; rebalancing is not modeled.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition_for(key: &str) -> i32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % PARTITIONS as u64) as i32
    }

    /// All payloads currently retained on `topic`, in partition order.
    /// Test helper mirroring what a dashboard consumer would observe.
    pub fn payloads(&self, topic: &str) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let Some(log) = inner.topics.get(topic) else {
            return Vec::new();
        };
        log.partitions
            .iter()
            .flat_map(|p| p.iter().map(|r| r.payload.clone()))
            .collect()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<RecordMeta> {
        let meta = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            let log = inner
                .topics
                .entry(topic.to_string())
                .or_insert_with(TopicLog::new);
            let partition = Self::partition_for(key);
            let log_part = &mut log.partitions[partition as usize];
            log_part.push(StoredRecord {
                key: Some(key.to_string()),
                payload: payload.to_vec(),
            });
            RecordMeta {
                topic: topic.to_string(),
                partition,
                offset: (log_part.len() - 1) as i64,
            }
        };
        self.notify.notify_waiters();
        Ok(meta)
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        reset: OffsetReset,
    ) -> Result<Box<dyn Subscription>> {
        let positions = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            let log = inner
                .topics
                .entry(topic.to_string())
                .or_insert_with(TopicLog::new);
            let ends: Vec<i64> = log.partitions.iter().map(|p| p.len() as i64).collect();

            (0..PARTITIONS)
                .map(|p| {
                    let committed = inner
                        .committed
                        .get(&(group.to_string(), topic.to_string(), p))
                        .copied();
                    let start = match (committed, reset) {
                        (Some(offset), _) => offset,
                        (None, OffsetReset::Earliest) => 0,
                        (None, OffsetReset::Latest) => ends[p as usize],
                    };
                    (p, start)
                })
                .collect::<HashMap<i32, i64>>()
        };

        Ok(Box::new(MemorySubscription {
            bus: self.clone(),
            topic: topic.to_string(),
            group: group.to_string(),
            positions,
        }))
    }
}

struct MemorySubscription {
    bus: MemoryBus,
    topic: String,
    group: String,
    positions: HashMap<i32, i64>,
}

impl MemorySubscription {
    fn try_fetch(&mut self) -> Option<Record> {
        let inner = self.bus.inner.lock().unwrap_or_else(|p| p.into_inner());
        let log = inner.topics.get(&self.topic)?;
        for partition in 0..PARTITIONS {
            let position = self.positions.get(&partition).copied().unwrap_or(0);
            let log_part = &log.partitions[partition as usize];
            if (position as usize) < log_part.len() {
                let stored = &log_part[position as usize];
                let record = Record {
                    topic: self.topic.clone(),
                    partition,
                    offset: position,
                    key: stored.key.clone(),
                    payload: stored.payload.clone(),
                };
                self.positions.insert(partition, position + 1);
                return Some(record);
            }
        }
        None
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Result<Record> {
        loop {
            let notified = self.bus.notify.notified();
            if let Some(record) = self.try_fetch() {
                return Ok(record);
            }
            notified.await;
        }
    }

    async fn ack(&mut self, record: &Record) -> Result<()> {
        let mut inner = self.bus.inner.lock().unwrap_or_else(|p| p.into_inner());
        let entry = inner
            .committed
            .entry((self.group.clone(), self.topic.clone(), record.partition))
            .or_insert(0);
        *entry = (*entry).max(record.offset + 1);
        Ok(())
    }
}
